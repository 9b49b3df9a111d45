//! Handshake control shared by fixed-latency binary operators.
//!
//! Operands are joined, their valid travels through a delay buffer of `latency - 1` slots and a
//! one-slot data/valid break. The break's `ins_ready` enables every pipeline stage, including the
//! operator core, so the datapath stalls together with the valid path.

use elasticgen::port::{clock_decls, handshake_decls, Direction};
use elasticgen::signal_manager::generate_buffered_signal_manager;
use elasticgen::vir::{Declaration, Expression, Module, ModuleInstantiation, ModuleItem};
use elasticgen::*;

use crate::buffers::one_slot_break_dv;
use crate::delay_buffer::delay_buffer;
use crate::join::join;

/// Enable of the operator pipeline.
pub(crate) const ENABLE: &str = "one_slot_break_dv_ready";

/// Module with `lhs`, `rhs` and `result` handshake ports of `bitwidth` bits.
pub(crate) fn operator_module(id: &InstanceId, bitwidth: u32) -> Module {
    let mut module = Module::new(id.to_string());
    module.port_decls.extend(clock_decls());
    module.port_decls.extend(handshake_decls(Direction::In, "lhs", bitwidth, 1));
    module.port_decls.extend(handshake_decls(Direction::In, "rhs", bitwidth, 1));
    module.port_decls.extend(handshake_decls(Direction::Out, "result", bitwidth, 1));
    module
}

/// Adds the join, the delay buffer and the output buffer of an operator of `latency >= 1` cycles.
///
/// Returns the latency of the resulting valid path.
pub(crate) fn add_control(acc: &mut Accumulator, module: &mut Module, latency: u32) -> Result<u32, GenError> {
    let join = acc.require(Role::Join, |id| join(id, 2))?;
    let buff = acc.require(Role::Buff, |id| delay_buffer(id, latency.saturating_sub(1)))?;
    let output = acc.require(Role::OneSlotBreakDv, |id| one_slot_break_dv(id, 0))?;

    module.module_items.push(ModuleItem::Declarations(vec![
        Declaration::net(1, "join_valid"),
        Declaration::net(1, "buff_valid"),
        Declaration::net(1, ENABLE),
    ]));
    module.module_items.push(ModuleItem::ModuleInstantiation(
        ModuleInstantiation::new(join.name(), "join_inputs")
            .connect("ins_valid", Expression::concat(vec!["rhs_valid".into(), "lhs_valid".into()]))
            .connect("outs_ready", ENABLE.into())
            .connect("outs_valid", "join_valid".into())
            .connect("ins_ready", Expression::concat(vec!["rhs_ready".into(), "lhs_ready".into()])),
    ));
    module.module_items.push(ModuleItem::ModuleInstantiation(
        ModuleInstantiation::new(buff.name(), "buff")
            .connect("clk", "clk".into())
            .connect("rst", "rst".into())
            .connect("valid_in", "join_valid".into())
            .connect("ready_in", ENABLE.into())
            .connect("valid_out", "buff_valid".into()),
    ));
    module.module_items.push(ModuleItem::ModuleInstantiation(
        ModuleInstantiation::new(output.name(), "one_slot_break_dv")
            .connect("clk", "clk".into())
            .connect("rst", "rst".into())
            .connect("ins_valid", "buff_valid".into())
            .connect("ins_ready", ENABLE.into())
            .connect("outs_valid", "result_valid".into())
            .connect("outs_ready", "result_ready".into()),
    ));

    Ok(join.latency + buff.latency + output.latency)
}

/// Generates the operator `core` in the shape selected by `variant`. With extra signals, the core
/// is wrapped by the buffered signal manager with the given `latency`.
pub(crate) fn generate_operator<G>(id: &InstanceId, variant: Variant, latency: u32, core: G) -> Result<Artifact, GenError>
where G: FnOnce(&InstanceId) -> Result<Artifact, GenError> {
    match variant {
        Variant::SignalManaged { bitwidth, extra_signals } => {
            let port = |name: &str| PortGroup::new(name, bitwidth, extra_signals.clone());
            generate_buffered_signal_manager(
                id,
                &[port("lhs"), port("rhs")],
                &[port("result")],
                &extra_signals,
                core,
                latency,
            )
        }
        Variant::Dataless | Variant::Scalar { .. } => core(id),
    }
}
