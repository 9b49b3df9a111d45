//! Floating-point operators built on externally provided IP cores.
//!
//! Operands are converted from IEEE-754 to the cores' internal format (two extra exception bits)
//! and the result is converted back. The cores themselves are not generated; artifacts list them
//! in [`Artifact::externals`].

use elasticgen::vir::{ContinuousAssign, Declaration, Expression, ModuleInstantiation, ModuleItem};
use elasticgen::*;

use crate::pipeline::{add_control, generate_operator, operator_module, ENABLE};

/// Floating-point operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FloatOp {
    Mul,
    Sub,
}

impl FloatOp {
    fn kind(self) -> &'static str {
        match self {
            FloatOp::Mul => "mulf",
            FloatOp::Sub => "subf",
        }
    }

    fn latency(self, precision: Precision) -> u32 {
        match (self, precision) {
            (FloatOp::Mul, _) => 4,
            (FloatOp::Sub, Precision::Single) => 9,
            (FloatOp::Sub, Precision::Double) => 12,
        }
    }

    /// Subtraction runs on the adder with the sign of `rhs` flipped.
    fn core(self, precision: Precision) -> &'static str {
        match (self, precision) {
            (FloatOp::Mul, Precision::Single) => "FloatingPointMultiplier",
            (FloatOp::Mul, Precision::Double) => "FPMult_64bit",
            (FloatOp::Sub, Precision::Single) => "FloatingPointAdder",
            (FloatOp::Sub, Precision::Double) => "FPAdd_64bit",
        }
    }
}

fn input_converter(precision: Precision) -> String { format!("InputIEEE_{}bit", precision.bitwidth()) }

fn output_converter(precision: Precision) -> String { format!("OutputIEEE_{}bit", precision.bitwidth()) }

/// Generates a floating-point multiplier. Latency 4 in both precisions.
pub fn generate_mulf(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    generate_float(id, params, FloatOp::Mul)
}

/// Generates a floating-point subtractor. Latency 9 in single and 12 in double precision.
pub fn generate_subf(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    generate_float(id, params, FloatOp::Sub)
}

fn generate_float(id: &InstanceId, params: &ParamMap, op: FloatOp) -> Result<Artifact, GenError> {
    let precision = Precision::from_params(params)?;
    let variant = dispatch(op.kind(), ShapeSupport::DATA_ONLY, precision.bitwidth(), params.extra_signals()?)?;
    generate_operator(id, variant, op.latency(precision), |id| float(id, op, precision))
}

fn float(id: &InstanceId, op: FloatOp, precision: Precision) -> Result<Artifact, GenError> {
    let width = precision.bitwidth() as usize;
    let mut acc = Accumulator::new(id.clone());
    let mut module = operator_module(id, precision.bitwidth());
    let latency = add_control(&mut acc, &mut module, op.latency(precision))?;

    for core in [input_converter(precision), output_converter(precision), op.core(precision).to_string()] {
        acc.external(core)?;
    }

    let mut decls = vec![
        Declaration::net(width + 2, "ip_lhs"),
        Declaration::net(width + 2, "ip_rhs"),
        Declaration::net(width + 2, "ip_result"),
    ];
    let rhs = match op {
        FloatOp::Mul => "rhs",
        FloatOp::Sub => {
            decls.push(Declaration::net(width, "rhs_neg"));
            "rhs_neg"
        }
    };
    module.module_items.push(ModuleItem::Declarations(decls));
    if op == FloatOp::Sub {
        module.module_items.push(ModuleItem::ContinuousAssigns(vec![ContinuousAssign::new(
            "rhs_neg".into(),
            Expression::concat(vec![
                Expression::select("rhs", width, width - 1, 1).not(),
                Expression::select("rhs", width, 0, width - 1),
            ]),
        )]));
    }

    let convert = |module_name: String, inst: &str, from: &str, to: &str| {
        ModuleItem::ModuleInstantiation(
            ModuleInstantiation::new(module_name, inst).connect("X", from.into()).connect("R", to.into()),
        )
    };
    module.module_items.extend([
        convert(input_converter(precision), "ieee2nfloat_lhs", "lhs", "ip_lhs"),
        convert(input_converter(precision), "ieee2nfloat_rhs", rhs, "ip_rhs"),
        convert(output_converter(precision), "nfloat2ieee_result", "ip_result", "result"),
    ]);
    module.module_items.push(ModuleItem::ModuleInstantiation(
        ModuleInstantiation::new(op.core(precision), "ip")
            .connect("clk", "clk".into())
            .connect("ce", ENABLE.into())
            .connect("X", "ip_lhs".into())
            .connect("Y", "ip_rhs".into())
            .connect("R", "ip_result".into()),
    ));

    acc.finish(module, latency)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(is_double: bool) -> ParamMap { ParamMap::new().with(ParamKey::IsDouble, is_double) }

    #[test]
    fn latency_follows_precision() {
        let id = InstanceId::new("f").unwrap();
        assert_eq!(generate_mulf(&id, &params(false)).unwrap().latency(), 4);
        assert_eq!(generate_mulf(&id, &params(true)).unwrap().latency(), 4);
        assert_eq!(generate_subf(&id, &params(false)).unwrap().latency(), 9);
        assert_eq!(generate_subf(&id, &params(true)).unwrap().latency(), 12);
    }

    #[test]
    fn cores_are_external() {
        let id = InstanceId::new("subf0").unwrap();
        let artifact = generate_subf(&id, &params(true)).unwrap();
        assert_eq!(artifact.externals(), ["InputIEEE_64bit", "OutputIEEE_64bit", "FPAdd_64bit"]);
        assert!(artifact.get("FPAdd_64bit").is_none());
        let text = artifact.text();
        assert!(text.contains("assign rhs_neg = {~rhs[63], rhs[0 +: 63]};"));
        assert!(text.contains("InputIEEE_64bit ieee2nfloat_rhs ("));
        assert!(text.contains("wire [66-1:0] ip_result;"));
    }

    #[test]
    fn multiplier_uses_rhs_directly() {
        let id = InstanceId::new("mulf0").unwrap();
        let text = generate_mulf(&id, &params(false)).unwrap().text();
        assert!(!text.contains("rhs_neg"));
        assert!(text.contains("FloatingPointMultiplier ip ("));
        assert!(text.contains("input wire [32-1:0] lhs,"));
    }

    #[test]
    fn precision_is_required() {
        let id = InstanceId::new("mulf0").unwrap();
        assert!(matches!(generate_mulf(&id, &ParamMap::new()), Err(GenError::InvalidParameter { .. })));
    }

    #[test]
    fn extra_signals_use_the_declared_latency() {
        let spec = ExtraSignals::from_pairs([("spec", 1)]).unwrap();
        let id = InstanceId::new("subf0").unwrap();
        let artifact = generate_subf(&id, &params(false).with(ParamKey::ExtraSignals, &spec)).unwrap();
        assert_eq!(artifact.get("subf0_buff").map(|block| block.latency()), Some(9));
        assert_eq!(artifact.externals().len(), 3);
    }
}
