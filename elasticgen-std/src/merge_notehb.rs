//! Merge without output buffering.

use elasticgen::port::{clock_decls, handshake_decls, Direction};
use elasticgen::vir::{ContinuousAssign, Expression, Module, ModuleItem};
use elasticgen::*;

use crate::{channel_count, generate_pass_through};

/// Generates a combinational merge of `size` channels.
///
/// The lowest-indexed valid input wins; the others wait until it has been consumed.
pub fn generate_merge_notehb(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    let size = channel_count(params)?;
    generate_pass_through(id, "merge_notehb", params, Some(size), |id, bitwidth| merge_notehb(id, size, bitwidth))
}

pub(crate) fn merge_notehb(id: &InstanceId, size: u32, bitwidth: u32) -> Result<Artifact, GenError> {
    let mut module = Module::new(id.to_string());
    module.port_decls.extend(clock_decls());
    module.port_decls.extend(handshake_decls(Direction::In, "ins", bitwidth, size));
    module.port_decls.extend(handshake_decls(Direction::Out, "outs", bitwidth, 1));

    let (size, width) = (size as usize, bitwidth as usize);
    let valid = |i: usize| Expression::select("ins_valid", size, i, 1);
    let data = |i: usize| Expression::select("ins", size * width, i * width, width);

    let mut conts = Vec::new();
    if width > 0 {
        let selected =
            (0..size - 1).rev().fold(data(size - 1), |rest, i| Expression::conditional(valid(i), data(i), rest));
        conts.push(ContinuousAssign::new("outs".into(), selected));
    }
    conts.push(ContinuousAssign::new("outs_valid".into(), Expression::or_all((0..size).map(valid))));
    for i in 0..size {
        let ready = if i == 0 {
            Expression::from("outs_ready")
        } else {
            Expression::from("outs_ready").and(Expression::or_all((0..i).map(valid)).not())
        };
        conts.push(ContinuousAssign::new(Expression::select("ins_ready", size, i, 1), ready));
    }
    module.module_items.push(ModuleItem::ContinuousAssigns(conts));

    Accumulator::new(id.clone()).finish(module, 0)
}
