//! Merge: forwards a token from any of `size` input channels.

use elasticgen::port::{clock_decls, handshake_decls, Direction};
use elasticgen::vir::{Declaration, Module, ModuleInstantiation, ModuleItem};
use elasticgen::*;

use crate::buffers::one_slot_break_r;
use crate::merge_notehb::merge_notehb;
use crate::{channel_count, generate_pass_through};

/// Generates a merge of `size` channels: a combinational merge followed by a one-slot buffer
/// breaking the ready path.
pub fn generate_merge(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    let size = channel_count(params)?;
    generate_pass_through(id, "merge", params, Some(size), |id, bitwidth| merge(id, size, bitwidth))
}

fn merge(id: &InstanceId, size: u32, bitwidth: u32) -> Result<Artifact, GenError> {
    let mut acc = Accumulator::new(id.clone());
    let inner = acc.require(Role::Inner, |id| merge_notehb(id, size, bitwidth))?;
    let output = acc.require(Role::OneSlotBreakR, |id| one_slot_break_r(id, bitwidth))?;

    let mut module = Module::new(id.to_string());
    module.port_decls.extend(clock_decls());
    module.port_decls.extend(handshake_decls(Direction::In, "ins", bitwidth, size));
    module.port_decls.extend(handshake_decls(Direction::Out, "outs", bitwidth, 1));

    let mut decls = Vec::new();
    if bitwidth > 0 {
        decls.push(Declaration::net(bitwidth as usize, "one_slot_break_r_data_in"));
    }
    decls.push(Declaration::net(1, "one_slot_break_r_pvalid"));
    decls.push(Declaration::net(1, "one_slot_break_r_ready"));
    module.module_items.push(ModuleItem::Declarations(decls));

    let mut merge_ins =
        ModuleInstantiation::new(inner.name(), "merge_ins").connect("clk", "clk".into()).connect("rst", "rst".into());
    if bitwidth > 0 {
        merge_ins = merge_ins.connect("ins", "ins".into());
    }
    merge_ins = merge_ins
        .connect("ins_valid", "ins_valid".into())
        .connect("ins_ready", "ins_ready".into())
        .connect("outs_valid", "one_slot_break_r_pvalid".into())
        .connect("outs_ready", "one_slot_break_r_ready".into());
    if bitwidth > 0 {
        merge_ins = merge_ins.connect("outs", "one_slot_break_r_data_in".into());
    }

    let mut buffer = ModuleInstantiation::new(output.name(), "one_slot_break_r")
        .connect("clk", "clk".into())
        .connect("rst", "rst".into());
    if bitwidth > 0 {
        buffer = buffer.connect("ins", "one_slot_break_r_data_in".into());
    }
    buffer = buffer
        .connect("ins_valid", "one_slot_break_r_pvalid".into())
        .connect("ins_ready", "one_slot_break_r_ready".into())
        .connect("outs_valid", "outs_valid".into())
        .connect("outs_ready", "outs_ready".into());
    if bitwidth > 0 {
        buffer = buffer.connect("outs", "outs".into());
    }

    module.module_items.push(ModuleItem::ModuleInstantiation(merge_ins));
    module.module_items.push(ModuleItem::ModuleInstantiation(buffer));

    acc.finish(module, inner.latency + output.latency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_merge() {
        let id = InstanceId::new("merge0").unwrap();
        let params = ParamMap::new().with(ParamKey::Size, 3u32).with(ParamKey::Bitwidth, 16u32);
        let artifact = generate_merge(&id, &params).unwrap();
        let top = artifact.top().unwrap().module();
        assert_eq!(top.port("ins").map(|port| port.width()), Some(48));
        assert_eq!(top.port("outs").map(|port| port.width()), Some(16));
        assert_eq!(artifact.latency(), 0);
        assert_eq!(top.instantiated_modules(), vec!["merge0_inner", "merge0_one_slot_break_r"]);
    }

    #[test]
    fn size_is_required() {
        let id = InstanceId::new("merge0").unwrap();
        let params = ParamMap::new().with(ParamKey::Bitwidth, 16u32);
        assert!(matches!(generate_merge(&id, &params), Err(GenError::InvalidParameter { key, .. }) if key == "size"));
    }
}
