//! Pipelined integer multiplier.

use elasticgen::vir::{
    ContinuousAssign, Declaration, Expression, Module, ModuleInstantiation, ModuleItem, PortDeclaration, Statement,
};
use elasticgen::*;
use itertools::Itertools;

use crate::pipeline::{add_control, generate_operator, operator_module, ENABLE};

/// Cycles from operands to product.
pub(crate) const LATENCY: u32 = 4;

/// Generates a `bitwidth`-bit multiplier with a latency of 4 cycles. The product is truncated to
/// `bitwidth` bits.
pub fn generate_muli(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    let variant = dispatch::dispatch_params("muli", ShapeSupport::DATA_ONLY, params, ParamKey::Bitwidth)?;
    let bitwidth = match &variant {
        Variant::Scalar { bitwidth } | Variant::SignalManaged { bitwidth, .. } if *bitwidth > 0 => *bitwidth,
        // Extra signals alone still leave the operands dataless.
        _ => return Err(GenError::UnsupportedVariantCombination { kind: "muli".to_string(), shape: Shape::Dataless }),
    };
    generate_operator(id, variant, LATENCY, |id| muli(id, bitwidth, |id| mul_4_stage(id, bitwidth)))
}

/// Multiplier around the core built by `core`, whose latency must match the valid path.
fn muli<C>(id: &InstanceId, bitwidth: u32, core: C) -> Result<Artifact, GenError>
where C: FnOnce(&InstanceId) -> Result<Artifact, GenError> {
    let mut acc = Accumulator::new(id.clone());
    let mut module = operator_module(id, bitwidth);
    let core = acc.require(Role::Mul4Stage, core)?;
    let latency = add_control(&mut acc, &mut module, LATENCY)?;
    if core.latency != latency {
        return Err(GenError::LatencyMismatch { unit: id.to_string(), declared: latency, actual: core.latency });
    }

    module.module_items.push(ModuleItem::ModuleInstantiation(
        ModuleInstantiation::new(core.name(), "multiply_unit")
            .connect("clk", "clk".into())
            .connect("ce", ENABLE.into())
            .connect("a", "lhs".into())
            .connect("b", "rhs".into())
            .connect("p", "result".into()),
    ));

    acc.finish(module, latency)
}

/// Four-stage multiplier core: registered operands, then three product registers.
fn mul_4_stage(id: &InstanceId, bitwidth: u32) -> Result<Artifact, GenError> {
    multiplier_core(id, bitwidth, LATENCY - 1)
}

/// Multiplier core with registered operands followed by `product_stages >= 1` product registers.
/// Its latency is the length of that register chain.
fn multiplier_core(id: &InstanceId, bitwidth: u32, product_stages: u32) -> Result<Artifact, GenError> {
    let width = bitwidth as usize;
    let mut module = Module::new(id.to_string());
    module.port_decls.extend([
        PortDeclaration::input(1, "clk"),
        PortDeclaration::input(1, "ce"),
        PortDeclaration::input(width, "a"),
        PortDeclaration::input(width, "b"),
        PortDeclaration::output(width, "p"),
    ]);

    let products = (0..product_stages.max(1)).map(|i| format!("q{}", i)).collect::<Vec<_>>();
    let last = products.last().cloned().unwrap_or_default();
    let mut decls = ["a_reg", "b_reg"].iter().map(|reg| Declaration::reg(width, *reg)).collect::<Vec<_>>();
    decls.extend(products.iter().map(|reg| Declaration::reg(width, reg.clone())));
    decls.push(Declaration::net(width, "mul"));
    module.module_items.push(ModuleItem::Declarations(decls));
    module.module_items.push(ModuleItem::ContinuousAssigns(vec![
        ContinuousAssign::new("mul".into(), Expression::from("a_reg").mul("b_reg".into())),
        ContinuousAssign::new("p".into(), last.into()),
    ]));

    let mut shift = vec![
        Statement::nonblocking_assignment("a_reg".into(), "a".into()),
        Statement::nonblocking_assignment("b_reg".into(), "b".into()),
    ];
    shift.extend(
        std::iter::once("mul".to_string())
            .chain(products.iter().cloned())
            .tuple_windows()
            .map(|(from, to)| Statement::nonblocking_assignment(to.into(), from.into())),
    );
    module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional("ce".into(), shift, Vec::new())]));

    Accumulator::new(id.clone()).finish(module, 1 + products.len() as u32)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use elasticgen::vir::eval::{flatten, Evaluator};
    use proptest::prelude::*;

    use super::*;

    fn params(bitwidth: u32) -> ParamMap { ParamMap::new().with(ParamKey::Bitwidth, bitwidth) }

    fn tag() -> ExtraSignals { ExtraSignals::from_pairs([("tag", 4)]).unwrap() }

    #[test]
    fn scalar_multiplier() {
        let id = InstanceId::new("muli0").unwrap();
        let artifact = generate_muli(&id, &params(32)).unwrap();
        let names = artifact.blocks().iter().map(|block| block.identity()).collect::<Vec<_>>();
        assert_eq!(names, vec!["muli0_mul_4_stage", "muli0_join", "muli0_buff", "muli0_one_slot_break_dv", "muli0"]);
        assert_eq!(artifact.latency(), LATENCY);
        assert_eq!(artifact.get("muli0_mul_4_stage").map(|block| block.latency()), Some(LATENCY));
        assert_eq!(artifact.get("muli0_buff").map(|block| block.latency()), Some(LATENCY - 1));
        assert!(artifact.text().contains(".ce(one_slot_break_dv_ready)"));
    }

    #[test]
    fn product_register_chain() {
        let id = InstanceId::new("m").unwrap();
        let text = mul_4_stage(&id, 16).unwrap().text();
        assert!(text.contains("assign mul = a_reg * b_reg;"));
        assert!(text.contains("q0 <= mul;"));
        assert!(text.contains("q2 <= q1;"));
        assert!(text.contains("assign p = q2;"));
    }

    #[test]
    fn core_depth_must_match_the_valid_path() {
        let id = InstanceId::new("muli0").unwrap();
        let result = muli(&id, 16, |id| multiplier_core(id, 16, LATENCY));
        assert_eq!(result, Err(GenError::LatencyMismatch {
            unit: "muli0".to_string(),
            declared: LATENCY,
            actual: LATENCY + 1
        }));
    }

    #[test]
    fn dataless_is_unsupported() {
        let id = InstanceId::new("muli0").unwrap();
        let dataless = GenError::UnsupportedVariantCombination { kind: "muli".to_string(), shape: Shape::Dataless };
        assert_eq!(generate_muli(&id, &params(0)), Err(dataless.clone()));
        assert_eq!(generate_muli(&id, &params(0).with(ParamKey::ExtraSignals, &tag())), Err(dataless));
    }

    #[test]
    fn extra_signals_are_buffered() {
        let id = InstanceId::new("muli0").unwrap();
        let artifact = generate_muli(&id, &params(32).with(ParamKey::ExtraSignals, &tag())).unwrap();
        assert_eq!(artifact.top().map(|block| block.identity()), Some("muli0"));
        assert!(artifact.get("muli0_inner").is_some());
        assert!(artifact.get("muli0_inner_buff").is_some());
        assert_eq!(artifact.get("muli0_buff").map(|block| block.latency()), Some(LATENCY));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Every product leaves the wrapper with the tag of the left operand it was computed from.
        #[test]
        fn tags_follow_their_products(
            cycles in prop::collection::vec(
                (any::<bool>(), any::<bool>(), any::<bool>(), any::<u8>(), any::<u8>(), 0u8..16),
                1..80,
            ),
        ) {
            let id = InstanceId::new("muli0").unwrap();
            let artifact = generate_muli(&id, &params(8).with(ParamKey::ExtraSignals, &tag())).unwrap();
            let mut eval = Evaluator::new(&flatten(&artifact));
            eval.set("rst", 1);
            eval.tick();
            eval.set("rst", 0);

            let mut lhs: Option<(u8, u8)> = None;
            let mut rhs: Option<u8> = None;
            let mut issued = VecDeque::new();
            let drain = (false, false, true, 0, 0, 0);
            let cycles = cycles.into_iter().chain(std::iter::repeat(drain).take(2 * LATENCY as usize));
            for (offer_lhs, offer_rhs, ready, a, b, t) in cycles {
                if offer_lhs && lhs.is_none() {
                    lhs = Some((a, t));
                }
                if offer_rhs && rhs.is_none() {
                    rhs = Some(b);
                }
                let (a, t) = lhs.unwrap_or_default();
                eval.set("lhs", u128::from(a));
                eval.set("lhs_tag", u128::from(t));
                eval.set("lhs_valid", u128::from(lhs.is_some()));
                eval.set("rhs", u128::from(rhs.unwrap_or_default()));
                eval.set("rhs_tag", u128::from(!t & 0xf));
                eval.set("rhs_valid", u128::from(rhs.is_some()));
                eval.set("result_ready", u128::from(ready));
                eval.settle();

                let lhs_fire = eval.get("lhs_valid") & eval.get("lhs_ready") == 1;
                let rhs_fire = eval.get("rhs_valid") & eval.get("rhs_ready") == 1;
                prop_assert_eq!(lhs_fire, rhs_fire);
                if lhs_fire {
                    let product = u128::from(a) * u128::from(rhs.unwrap_or_default()) & 0xff;
                    issued.push_back((product, u128::from(t)));
                    lhs = None;
                    rhs = None;
                }
                if eval.get("result_valid") & eval.get("result_ready") == 1 {
                    let expected = issued.pop_front();
                    prop_assert_eq!(Some((eval.get("result"), eval.get("result_tag"))), expected);
                }
                eval.tick();
            }
            prop_assert!(issued.is_empty());
        }
    }
}
