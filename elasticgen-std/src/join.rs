//! Join: synchronizes `size` handshake channels into one.

use elasticgen::port::{handshake_decls, Direction};
use elasticgen::vir::{ContinuousAssign, Expression, Module, ModuleItem};
use elasticgen::*;

use crate::channel_count;

/// Join parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JoinParams {
    size: u32,
}

impl JoinParams {
    fn from_params(params: &ParamMap) -> Result<Self, GenError> {
        let support = ShapeSupport { dataless: true, scalar: false, signal_managed: false };
        let _ = dispatch("join", support, 0, params.extra_signals()?)?;
        Ok(Self { size: channel_count(params)? })
    }
}

/// Generates a join of `size` channels. The output is valid when all inputs are; each input is
/// ready when the output is ready and all other inputs are valid.
pub fn generate_join(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    let JoinParams { size } = JoinParams::from_params(params)?;
    join(id, size)
}

pub(crate) fn join(id: &InstanceId, size: u32) -> Result<Artifact, GenError> {
    let mut module = Module::new(id.to_string());
    module.port_decls.extend(handshake_decls(Direction::In, "ins", 0, size));
    module.port_decls.extend(handshake_decls(Direction::Out, "outs", 0, 1));

    let size = size as usize;
    let valid = |i: usize| Expression::select("ins_valid", size, i, 1);

    let mut conts = vec![ContinuousAssign::new("outs_valid".into(), Expression::and_all((0..size).map(valid)))];
    for i in 0..size {
        let others = (0..size).filter(|j| *j != i).map(valid);
        conts.push(ContinuousAssign::new(
            Expression::select("ins_ready", size, i, 1),
            Expression::and_all(std::iter::once(Expression::from("outs_ready")).chain(others)),
        ));
    }
    module.module_items.push(ModuleItem::ContinuousAssigns(conts));

    Accumulator::new(id.clone()).finish(module, 0)
}
