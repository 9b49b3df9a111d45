//! Buffered signal manager.
//!
//! The inner unit computes a new payload, so extra signals cannot travel through it. Instead they
//! enter a [`DelayLine`] when the inputs are consumed and leave it when the matching result is
//! produced. The delay line advances under the same enable as the inner unit's pipeline
//! (`~valid[L-1] | outs_ready`), so the two stay aligned under arbitrary stalls.
//!
//! Extra signals of the first input port are forwarded; the others are dropped.

use tracing::debug;

use super::outer_ports;
use crate::artifact::{Accumulator, Artifact};
use crate::error::GenError;
use crate::ident::{InstanceId, Role};
use crate::params::ExtraSignals;
use crate::port::{clock_decls, PortGroup};
use crate::vir::{
    self, ContinuousAssign, Declaration, Expression, ModuleInstantiation, ModuleItem, PortDeclaration, Statement,
};
use crate::width::{Field, SliceBounds};

/// Stall-aware delay line of `latency` stages, each holding a valid bit and `bitwidth` data bits.
///
/// Ports: `clk`, `rst`, `ins`, `ins_valid`, `outs`, `outs_valid`, `outs_ready`. All stages advance
/// together whenever the last stage is empty or the consumer is ready. A zero-latency line is a
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayLine {
    /// Number of stages.
    pub latency: u32,
    /// Data width of each stage.
    pub bitwidth: u32,
}

impl DelayLine {
    fn valid(stage: u32) -> String { format!("valid_{}", stage) }

    fn data(stage: u32) -> String { format!("data_{}", stage) }

    /// Module implementing the line, without a name.
    pub fn module(&self) -> vir::Module {
        let width = self.bitwidth as usize;
        let mut module = vir::Module::new("");
        module.port_decls.extend(clock_decls());
        if width > 0 {
            module.port_decls.push(PortDeclaration::input(width, "ins"));
        }
        module.port_decls.push(PortDeclaration::input(1, "ins_valid"));
        if width > 0 {
            module.port_decls.push(PortDeclaration::output(width, "outs"));
        }
        module.port_decls.push(PortDeclaration::output(1, "outs_valid"));
        module.port_decls.push(PortDeclaration::input(1, "outs_ready"));

        if self.latency == 0 {
            let mut conts = Vec::new();
            if width > 0 {
                conts.push(ContinuousAssign::new("outs".into(), "ins".into()));
            }
            conts.push(ContinuousAssign::new("outs_valid".into(), "ins_valid".into()));
            module.module_items.push(ModuleItem::ContinuousAssigns(conts));
            return module;
        }

        let last = self.latency - 1;
        let mut decls = (0..self.latency).map(|stage| Declaration::reg(1, Self::valid(stage))).collect::<Vec<_>>();
        if width > 0 {
            decls.extend((0..self.latency).map(|stage| Declaration::reg(width, Self::data(stage))));
        }
        decls.push(Declaration::net(1, "en"));
        module.module_items.push(ModuleItem::Declarations(decls));

        module.module_items.push(ModuleItem::ContinuousAssigns(vec![ContinuousAssign::new(
            "en".into(),
            Expression::from(Self::valid(last)).not().or("outs_ready".into()),
        )]));

        let shift = |name: fn(u32) -> String, input: &str| {
            (0..self.latency)
                .map(|stage| {
                    let from = if stage == 0 { Expression::from(input) } else { Expression::from(name(stage - 1)) };
                    Statement::nonblocking_assignment(name(stage).into(), from)
                })
                .collect::<Vec<_>>()
        };
        let reset =
            (0..self.latency).map(|stage| Statement::nonblocking_assignment(Self::valid(stage).into(), Expression::bit(false)));
        module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional(
            "rst".into(),
            reset.collect(),
            vec![Statement::conditional("en".into(), shift(Self::valid, "ins_valid"), Vec::new())],
        )]));
        if width > 0 {
            module
                .module_items
                .push(ModuleItem::always_ff(vec![Statement::conditional("en".into(), shift(Self::data, "ins"), Vec::new())]));
        }

        let mut conts = Vec::new();
        if width > 0 {
            conts.push(ContinuousAssign::new("outs".into(), Self::data(last).into()));
        }
        conts.push(ContinuousAssign::new("outs_valid".into(), Self::valid(last).into()));
        module.module_items.push(ModuleItem::ContinuousAssigns(conts));
        module
    }

    /// Generates the line as the module `id`.
    pub fn generate(&self, id: &InstanceId) -> Result<Artifact, GenError> {
        Accumulator::new(id.clone()).finish(self.module(), self.latency)
    }
}

/// Wraps the unit built by `generate_inner` so that extra signals bypass it with `latency` cycles
/// of delay.
///
/// The inner unit must have the wrapper's payload, valid and ready ports and a latency equal to
/// `latency`; otherwise the result is a [`GenError::LatencyMismatch`]. The delay line records a
/// token whenever all input channels are valid while the line advances, and is drained by the
/// first output port's ready.
pub fn generate_buffered_signal_manager<F>(
    id: &InstanceId, in_ports: &[PortGroup], out_ports: &[PortGroup], extra_signals: &ExtraSignals, generate_inner: F,
    latency: u32,
) -> Result<Artifact, GenError>
where
    F: FnOnce(&InstanceId) -> Result<Artifact, GenError>,
{
    let mut module = vir::Module::new(id.to_string());
    module.port_decls = outer_ports(in_ports, out_ports, extra_signals)?;

    let mut acc = Accumulator::new(id.clone());
    let inner = acc.require(Role::Inner, generate_inner)?;
    if inner.latency != latency {
        return Err(GenError::LatencyMismatch { unit: id.to_string(), declared: latency, actual: inner.latency });
    }

    let line = DelayLine { latency, bitwidth: extra_signals.total_bitwidth() };
    debug!(unit = %id, latency, bitwidth = line.bitwidth, "buffering extra signals");
    let buff = acc.require(Role::Buff, |buff_id| line.generate(buff_id))?;

    let mut inst = ModuleInstantiation::new(inner.name(), Role::Inner.token())
        .connect("clk", "clk".into())
        .connect("rst", "rst".into());
    for group in in_ports.iter().chain(out_ports) {
        if group.bitwidth > 0 {
            inst = inst.connect(group.name.clone(), group.name.clone().into());
        }
        inst = inst.connect(group.valid(), group.valid().into()).connect(group.ready(), group.ready().into());
    }

    let layout = SliceBounds::new(0, extra_signals)?;
    let width = layout.total() as usize;
    let first = &in_ports[0];
    let mut pack = Vec::new();
    let mut unpack = Vec::new();
    for slice in &layout {
        let signal = match &slice.field {
            Field::Extra(signal) => signal,
            Field::Primary => continue,
        };
        let sw = slice.width as usize;
        let bus_slice = |bus: &str| Expression::select(bus, width, slice.lo as usize, sw);
        pack.push(ContinuousAssign::new(
            bus_slice("extra_ins"),
            Expression::select(first.extra(signal), first.channels() as usize * sw, 0, sw),
        ));
        for group in out_ports {
            let channels = group.channels() as usize;
            for channel in 0..channels {
                unpack.push(ContinuousAssign::new(
                    Expression::select(group.extra(signal), channels * sw, channel * sw, sw),
                    bus_slice("extra_outs"),
                ));
            }
        }
    }

    let all_valid = Expression::and_all(in_ports.iter().flat_map(|group| {
        let channels = group.channels() as usize;
        (0..channels).map(move |channel| Expression::select(group.valid(), channels, channel, 1))
    }));

    let mut buff_inst =
        ModuleInstantiation::new(buff.name(), Role::Buff.token()).connect("clk", "clk".into()).connect("rst", "rst".into());
    if width > 0 {
        buff_inst = buff_inst.connect("ins", "extra_ins".into());
    }
    buff_inst = buff_inst.connect("ins_valid", "extra_ins_valid".into());
    if width > 0 {
        buff_inst = buff_inst.connect("outs", "extra_outs".into());
    }
    let drain = Expression::select(out_ports[0].ready(), out_ports[0].channels() as usize, 0, 1);
    buff_inst = buff_inst.open("outs_valid").connect("outs_ready", drain);

    let mut decls = Vec::new();
    if width > 0 {
        decls.push(Declaration::net(width, "extra_ins"));
        decls.push(Declaration::net(width, "extra_outs"));
    }
    decls.push(Declaration::net(1, "extra_ins_valid"));
    module.module_items.push(ModuleItem::Declarations(decls));
    module.module_items.push(ModuleItem::ModuleInstantiation(inst));

    let mut conts = pack;
    conts.push(ContinuousAssign::new("extra_ins_valid".into(), all_valid));
    module.module_items.push(ModuleItem::Commented("Delay extra signals alongside the inner pipeline".to_string(), vec![
        ModuleItem::ContinuousAssigns(conts),
        ModuleItem::ModuleInstantiation(buff_inst),
    ]));
    if !unpack.is_empty() {
        module.module_items.push(ModuleItem::ContinuousAssigns(unpack));
    }

    acc.finish(module, latency)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;
    use crate::port::{handshake_decls, Direction};
    use crate::vir::eval::Evaluator;

    fn spec_tag() -> ExtraSignals { ExtraSignals::from_pairs([("spec", 1), ("tag", 3)]).unwrap() }

    fn operator(id: &InstanceId, latency: u32) -> Result<Artifact, GenError> {
        let mut module = vir::Module::new(id.to_string());
        module.port_decls.extend(clock_decls());
        module.port_decls.extend(handshake_decls(Direction::In, "lhs", 32, 1));
        module.port_decls.extend(handshake_decls(Direction::In, "rhs", 32, 1));
        module.port_decls.extend(handshake_decls(Direction::Out, "result", 32, 1));
        Accumulator::new(id.clone()).finish(module, latency)
    }

    fn muli(extra: &ExtraSignals, declared: u32, actual: u32) -> Result<Artifact, GenError> {
        let id = InstanceId::new("muli0").unwrap();
        let ports = |names: &[&str]| names.iter().map(|name| PortGroup::new(*name, 32, extra.clone())).collect::<Vec<_>>();
        generate_buffered_signal_manager(
            &id,
            &ports(&["lhs", "rhs"]),
            &ports(&["result"]),
            extra,
            |inner| operator(inner, actual),
            declared,
        )
    }

    #[test]
    fn wraps_inner_unit_with_delay_line() {
        let artifact = muli(&spec_tag(), 4, 4).unwrap();
        let names = artifact.blocks().iter().map(|block| block.identity()).collect::<Vec<_>>();
        assert_eq!(names, vec!["muli0_inner", "muli0_buff", "muli0"]);
        assert_eq!(artifact.latency(), 4);

        let top = artifact.top().unwrap().module();
        for port in ["lhs_spec", "lhs_tag", "rhs_spec", "rhs_tag", "result_spec", "result_tag"] {
            assert!(top.port(port).is_some(), "missing {}", port);
        }
        let text = artifact.text();
        assert!(text.contains("assign extra_ins[1 +: 3] = lhs_tag;"));
        assert!(text.contains("assign result_tag = extra_outs[1 +: 3];"));
        assert!(text.contains("assign extra_ins_valid = lhs_valid & rhs_valid;"));
        assert!(text.contains(".outs_ready(result_ready)"));
    }

    #[test]
    fn latency_must_match_inner_pipeline() {
        assert_eq!(
            muli(&spec_tag(), 4, 3),
            Err(GenError::LatencyMismatch { unit: "muli0".to_string(), declared: 4, actual: 3 })
        );
    }

    #[test]
    fn zero_latency_line_is_a_wire() {
        let line = DelayLine { latency: 0, bitwidth: 4 };
        let module = line.module();
        let mut eval = Evaluator::new(&module);
        eval.set("ins", 9);
        eval.set("ins_valid", 1);
        eval.settle();
        assert_eq!((eval.get("outs"), eval.get("outs_valid")), (9, 1));
    }

    #[test]
    fn reset_clears_the_line() {
        let line = DelayLine { latency: 2, bitwidth: 4 };
        let module = line.module();
        let mut eval = Evaluator::new(&module);
        eval.set("ins_valid", 1);
        eval.set("outs_ready", 1);
        eval.tick();
        eval.tick();
        assert_eq!(eval.get("outs_valid"), 1);
        eval.set("rst", 1);
        eval.tick();
        assert_eq!(eval.get("outs_valid"), 0);
    }

    /// Stall-gated pipeline of `latency` stages computing `f(payload)`, with the same enable as the
    /// operators wrapped by this manager.
    struct Pipeline {
        stages: VecDeque<Option<(u64, u64)>>,
    }

    impl Pipeline {
        fn new(latency: u32) -> Self { Self { stages: (0..latency).map(|_| None).collect() } }

        fn enable(&self, outs_ready: bool) -> bool { self.stages.back().map_or(true, Option::is_none) || outs_ready }

        fn output(&self) -> Option<(u64, u64)> { self.stages.back().copied().flatten() }

        fn tick(&mut self, input: Option<(u64, u64)>, outs_ready: bool) {
            if self.enable(outs_ready) {
                let _ = self.stages.pop_back();
                self.stages.push_front(input.map(|(a, b)| (a, a.wrapping_mul(b))));
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Drives the generated delay line next to a pipelined operator under random input and
        /// output stalls; every result must leave with the extra signals of its own operands.
        #[test]
        fn extra_signals_stay_aligned_under_stalls(
            latency in 1u32..6,
            input_valid in prop::collection::vec(any::<bool>(), 64),
            output_ready in prop::collection::vec(any::<bool>(), 64),
        ) {
            let line = DelayLine { latency, bitwidth: 8 };
            let module = line.module();
            let mut eval = Evaluator::new(&module);
            let mut pipeline = Pipeline::new(latency);
            let mut sent = VecDeque::new();
            let mut next = 0u64;

            for (valid, ready) in input_valid.into_iter().zip(output_ready) {
                if let Some((operand, product)) = pipeline.output() {
                    prop_assert_eq!(eval.get("outs_valid"), 1);
                    if ready {
                        let tag: u64 = sent.pop_front().unwrap();
                        prop_assert_eq!(operand, tag);
                        prop_assert_eq!(product, tag.wrapping_mul(3));
                        prop_assert_eq!(eval.get("outs") as u64, tag & 0xff);
                    }
                } else {
                    prop_assert_eq!(eval.get("outs_valid"), 0);
                }

                let transfer = valid && pipeline.enable(ready);
                if transfer {
                    sent.push_back(next);
                }
                eval.set("ins", u128::from(next));
                eval.set("ins_valid", u128::from(valid));
                eval.set("outs_ready", u128::from(ready));
                eval.tick();
                pipeline.tick(if valid { Some((next, 3)) } else { None }, ready);
                if transfer {
                    next += 1;
                }
            }
        }
    }
}
