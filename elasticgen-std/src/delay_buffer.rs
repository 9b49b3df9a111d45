//! Valid-only shift register, used to track tokens inside fixed-latency operators.

use elasticgen::port::clock_decls;
use elasticgen::vir::{ContinuousAssign, Declaration, Expression, Module, ModuleItem, PortDeclaration, Statement};
use elasticgen::*;
use itertools::Itertools;

/// Generates a delay buffer of `num_slots` slots.
///
/// Ports: `clk`, `rst`, `valid_in`, `ready_in`, `valid_out`. The register shifts whenever
/// `ready_in` is high.
pub fn generate_delay_buffer(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    delay_buffer(id, params.count(ParamKey::NumSlots)?)
}

pub(crate) fn delay_buffer(id: &InstanceId, slots: u32) -> Result<Artifact, GenError> {
    let mut module = Module::new(id.to_string());
    module.port_decls.extend(clock_decls());
    module.port_decls.extend([
        PortDeclaration::input(1, "valid_in"),
        PortDeclaration::input(1, "ready_in"),
        PortDeclaration::output(1, "valid_out"),
    ]);

    if slots == 0 {
        module
            .module_items
            .push(ModuleItem::ContinuousAssigns(vec![ContinuousAssign::new("valid_out".into(), "valid_in".into())]));
        return Accumulator::new(id.clone()).finish(module, 0);
    }

    let slot = |i: u32| format!("regs_{}", i);
    module.module_items.push(ModuleItem::Declarations((0..slots).map(|i| Declaration::reg(1, slot(i))).collect()));

    let reset = (0..slots).map(|i| Statement::nonblocking_assignment(slot(i).into(), Expression::bit(false))).collect();
    let shift = std::iter::once("valid_in".to_string())
        .chain((0..slots).map(slot))
        .tuple_windows()
        .map(|(from, to)| Statement::nonblocking_assignment(to.into(), from.into()))
        .collect();
    module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional("rst".into(), reset, vec![
        Statement::conditional("ready_in".into(), shift, Vec::new()),
    ])]));
    module
        .module_items
        .push(ModuleItem::ContinuousAssigns(vec![ContinuousAssign::new("valid_out".into(), slot(slots - 1).into())]));

    Accumulator::new(id.clone()).finish(module, slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_is_slot_count() {
        let id = InstanceId::new("buff").unwrap();
        let artifact = generate_delay_buffer(&id, &ParamMap::new().with(ParamKey::NumSlots, 3u32)).unwrap();
        assert_eq!(artifact.latency(), 3);
        let text = artifact.text();
        assert!(text.contains("regs_2 <= regs_1;"));
        assert!(text.contains("assign valid_out = regs_2;"));
    }

    #[test]
    fn zero_slots_is_a_wire() {
        let id = InstanceId::new("buff").unwrap();
        let artifact = delay_buffer(&id, 0).unwrap();
        assert_eq!(artifact.latency(), 0);
        assert!(artifact.text().contains("assign valid_out = valid_in;"));
    }

    #[test]
    fn slot_count_is_required() {
        let id = InstanceId::new("buff").unwrap();
        assert!(matches!(generate_delay_buffer(&id, &ParamMap::new()), Err(GenError::InvalidParameter { .. })));
    }
}
