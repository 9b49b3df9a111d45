//! One-slot buffer breaking the data and valid paths (opaque elastic buffer).

use elasticgen::port::{clock_decls, handshake_decls, Direction};
use elasticgen::vir::{ContinuousAssign, Declaration, Expression, Module, ModuleItem, Statement};
use elasticgen::*;

use crate::generate_pass_through;

/// Generates a one-slot buffer whose outputs are registered. Latency 1.
pub fn generate_one_slot_break_dv(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    generate_pass_through(id, "one_slot_break_dv", params, None, one_slot_break_dv)
}

pub(crate) fn one_slot_break_dv(id: &InstanceId, bitwidth: u32) -> Result<Artifact, GenError> {
    let width = bitwidth as usize;
    let mut module = Module::new(id.to_string());
    module.port_decls.extend(clock_decls());
    module.port_decls.extend(handshake_decls(Direction::In, "ins", bitwidth, 1));
    module.port_decls.extend(handshake_decls(Direction::Out, "outs", bitwidth, 1));

    let mut decls = vec![Declaration::reg(1, "valid_reg")];
    if width > 0 {
        decls.push(Declaration::reg(width, "data_reg"));
    }
    module.module_items.push(ModuleItem::Declarations(decls));

    let mut conts = vec![
        ContinuousAssign::new("ins_ready".into(), Expression::from("valid_reg").not().or("outs_ready".into())),
        ContinuousAssign::new("outs_valid".into(), "valid_reg".into()),
    ];
    if width > 0 {
        conts.push(ContinuousAssign::new("outs".into(), "data_reg".into()));
    }
    module.module_items.push(ModuleItem::ContinuousAssigns(conts));

    module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional(
        "rst".into(),
        vec![Statement::nonblocking_assignment("valid_reg".into(), Expression::bit(false))],
        vec![Statement::conditional(
            "ins_ready".into(),
            vec![Statement::nonblocking_assignment("valid_reg".into(), "ins_valid".into())],
            Vec::new(),
        )],
    )]));
    if width > 0 {
        module.module_items.push(ModuleItem::always_ff(vec![Statement::conditional(
            Expression::from("ins_ready").and("ins_valid".into()),
            vec![Statement::nonblocking_assignment("data_reg".into(), "ins".into())],
            Vec::new(),
        )]));
    }

    Accumulator::new(id.clone()).finish(module, 1)
}
