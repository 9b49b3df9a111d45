//! One-slot buffer breaking the ready path (transparent elastic buffer).

use elasticgen::port::{clock_decls, handshake_decls, Direction};
use elasticgen::vir::{ContinuousAssign, Declaration, Expression, Module, ModuleItem, Statement};
use elasticgen::*;

use crate::generate_pass_through;

/// Generates a one-slot buffer whose `ins_ready` does not depend on `outs_ready`.
///
/// While empty the buffer is transparent; a token refused by the consumer is stored and
/// presented again until it is accepted.
pub fn generate_one_slot_break_r(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    generate_pass_through(id, "one_slot_break_r", params, None, one_slot_break_r)
}

pub(crate) fn one_slot_break_r(id: &InstanceId, bitwidth: u32) -> Result<Artifact, GenError> {
    let width = bitwidth as usize;
    let mut module = Module::new(id.to_string());
    module.port_decls.extend(clock_decls());
    module.port_decls.extend(handshake_decls(Direction::In, "ins", bitwidth, 1));
    module.port_decls.extend(handshake_decls(Direction::Out, "outs", bitwidth, 1));

    let mut decls = vec![Declaration::reg(1, "full")];
    if width > 0 {
        decls.push(Declaration::reg(width, "data_reg"));
    }
    module.module_items.push(ModuleItem::Declarations(decls));

    let mut conts = vec![
        ContinuousAssign::new("ins_ready".into(), Expression::from("full").not()),
        ContinuousAssign::new("outs_valid".into(), Expression::from("ins_valid").or("full".into())),
    ];
    if width > 0 {
        conts.push(ContinuousAssign::new(
            "outs".into(),
            Expression::conditional("full".into(), "data_reg".into(), "ins".into()),
        ));
    }
    module.module_items.push(ModuleItem::ContinuousAssigns(conts));

    module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional(
        "rst".into(),
        vec![Statement::nonblocking_assignment("full".into(), Expression::bit(false))],
        vec![Statement::nonblocking_assignment(
            "full".into(),
            Expression::from("outs_valid").and(Expression::from("outs_ready").not()),
        )],
    )]));
    if width > 0 {
        module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional(
            "ins_ready".into(),
            vec![Statement::nonblocking_assignment("data_reg".into(), "ins".into())],
            Vec::new(),
        )]));
    }

    Accumulator::new(id.clone()).finish(module, 0)
}
