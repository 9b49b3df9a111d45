//! Concatenation signal manager.
//!
//! Every port `p` of the wrapper gets an internal bus `p_inner` of `channels * (bitwidth + extra)`
//! bits. Channel `i` of the bus holds the payload and the extra signals of channel `i` of `p`, laid
//! out by [`SliceBounds`]. Input buses are driven from the outer ports, output buses are split back
//! onto them, and handshake signals pass through untouched.

use tracing::debug;

use super::outer_ports;
use crate::artifact::{Accumulator, Artifact};
use crate::error::GenError;
use crate::ident::{InstanceId, Role};
use crate::params::ExtraSignals;
use crate::port::PortGroup;
use crate::vir::{self, ContinuousAssign, Declaration, Expression, ModuleInstantiation, ModuleItem};
use crate::width::{combined_width, Field, SliceBounds};

fn inner_bus(group: &PortGroup) -> String { format!("{}_inner", group.name) }

fn bus_width(group: &PortGroup, layout: &SliceBounds) -> usize { group.channels() as usize * layout.total() as usize }

/// `(bus slice, outer slice)` for every field of every channel of `group`.
fn field_pairs(group: &PortGroup, layout: &SliceBounds) -> Vec<(Expression, Expression)> {
    let channels = group.channels() as usize;
    let stride = layout.total() as usize;

    let mut pairs = Vec::new();
    for channel in 0..channels {
        for slice in layout {
            let width = slice.width as usize;
            let bus = Expression::select(inner_bus(group), channels * stride, channel * stride + slice.lo as usize, width);
            let outer = match &slice.field {
                Field::Primary => group.name.clone(),
                Field::Extra(signal) => group.extra(signal),
            };
            pairs.push((bus, Expression::select(outer, channels * width, channel * width, width)));
        }
    }
    pairs
}

/// Wraps the unit built by `generate_inner` so that it carries `extra_signals` on every port.
///
/// `generate_inner` receives the inner identity and the combined width of the first input port,
/// and must define a unit with the same port names as the wrapper whose payloads are that wide.
/// The wrapper has the latency of the inner unit.
pub fn generate_concat_signal_manager<F>(
    id: &InstanceId, in_ports: &[PortGroup], out_ports: &[PortGroup], extra_signals: &ExtraSignals, generate_inner: F,
) -> Result<Artifact, GenError>
where F: FnOnce(&InstanceId, u32) -> Result<Artifact, GenError> {
    let mut module = vir::Module::new(id.to_string());
    module.port_decls = outer_ports(in_ports, out_ports, extra_signals)?;

    let combined = combined_width(in_ports[0].bitwidth, extra_signals)?;
    let layouts = in_ports
        .iter()
        .chain(out_ports)
        .map(|group| SliceBounds::new(group.bitwidth, &group.extra_signals))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(unit = %id, combined, "concatenating extra signals");

    let mut acc = Accumulator::new(id.clone());
    let inner = acc.require(Role::Inner, |inner_id| generate_inner(inner_id, combined))?;

    let mut decls = Vec::new();
    let mut encode = Vec::new();
    let mut decode = Vec::new();
    let mut inst = ModuleInstantiation::new(inner.name(), Role::Inner.token())
        .connect("clk", "clk".into())
        .connect("rst", "rst".into());
    for (i, (group, layout)) in in_ports.iter().chain(out_ports).zip(&layouts).enumerate() {
        let pairs = field_pairs(group, layout).into_iter();
        if i < in_ports.len() {
            encode.extend(pairs.map(|(bus, outer)| ContinuousAssign::new(bus, outer)));
        } else {
            decode.extend(pairs.map(|(bus, outer)| ContinuousAssign::new(outer, bus)));
        }
        if bus_width(group, layout) > 0 {
            decls.push(Declaration::net(bus_width(group, layout), inner_bus(group)));
            inst = inst.connect(group.name.clone(), inner_bus(group).into());
        }
        inst = inst.connect(group.valid(), group.valid().into()).connect(group.ready(), group.ready().into());
    }

    if !decls.is_empty() {
        module.module_items.push(ModuleItem::Declarations(decls));
    }
    if !encode.is_empty() {
        module.module_items.push(ModuleItem::Commented("Concatenate extra signals".to_string(), vec![
            ModuleItem::ContinuousAssigns(encode),
        ]));
    }
    if !decode.is_empty() {
        module.module_items.push(ModuleItem::Commented("Split extra signals".to_string(), vec![
            ModuleItem::ContinuousAssigns(decode),
        ]));
    }
    module.module_items.push(ModuleItem::ModuleInstantiation(inst));

    acc.finish(module, inner.latency)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::port::{handshake_decls, Direction};
    use crate::vir::eval::Evaluator;

    fn tag() -> ExtraSignals { ExtraSignals::from_pairs([("tag", 2)]).unwrap() }

    /// Stand-in for a metadata-oblivious unit.
    fn opaque(id: &InstanceId, ins: &str, channels: u32, width: u32, latency: u32) -> Result<Artifact, GenError> {
        let mut module = vir::Module::new(id.to_string());
        module.port_decls.extend(crate::port::clock_decls());
        module.port_decls.extend(handshake_decls(Direction::In, ins, width, channels));
        module.port_decls.extend(handshake_decls(Direction::Out, "outs", width, 1));
        Accumulator::new(id.clone()).finish(module, latency)
    }

    fn merge_wrapper(bitwidth: u32) -> Artifact {
        let id = InstanceId::new("merge0").unwrap();
        let ins = PortGroup::array("ins", bitwidth, tag(), 2);
        let outs = PortGroup::new("outs", bitwidth, tag());
        generate_concat_signal_manager(&id, &[ins], &[outs], &tag(), |inner, width| opaque(inner, "ins", 2, width, 1))
            .unwrap()
    }

    #[test]
    fn wraps_inner_unit() {
        let mut seen = None;
        let id = InstanceId::new("merge0").unwrap();
        let ins = PortGroup::array("ins", 8, tag(), 2);
        let outs = PortGroup::new("outs", 8, tag());
        let artifact = generate_concat_signal_manager(&id, &[ins], &[outs], &tag(), |inner, width| {
            seen = Some(width);
            opaque(inner, "ins", 2, width, 1)
        })
        .unwrap();

        assert_eq!(seen, Some(10));
        let names = artifact.blocks().iter().map(|block| block.identity()).collect::<Vec<_>>();
        assert_eq!(names, vec!["merge0_inner", "merge0"]);
        assert_eq!(artifact.latency(), 1);

        let top = artifact.top().unwrap().module();
        assert_eq!(top.port("ins_tag").map(|port| port.width()), Some(4));
        assert_eq!(top.port("outs_tag").map(|port| port.width()), Some(2));
        let text = artifact.text();
        assert!(text.contains("wire [20-1:0] ins_inner;"));
        assert!(text.contains("assign ins_inner[18 +: 2] = ins_tag[2 +: 2];"));
        assert!(text.contains("assign outs = outs_inner[0 +: 8];"));
        assert!(text.contains("merge0_inner inner ("));
    }

    #[test]
    fn dataless_payload_carries_only_extra_signals() {
        let artifact = merge_wrapper(0);
        let top = artifact.top().unwrap().module();
        assert!(top.port("ins").is_none());
        assert!(artifact.text().contains("assign ins_inner[2 +: 2] = ins_tag[2 +: 2];"));
        assert!(artifact.text().contains("assign outs_tag = outs_inner;"));
    }

    #[test]
    fn extra_signal_clashing_with_handshake_port() {
        let valid = ExtraSignals::from_pairs([("valid", 1)]).unwrap();
        let id = InstanceId::new("merge0").unwrap();
        let result = generate_concat_signal_manager(
            &id,
            &[PortGroup::new("ins", 8, valid.clone())],
            &[PortGroup::new("outs", 8, valid.clone())],
            &valid,
            |inner, width| opaque(inner, "ins", 1, width, 0),
        );
        assert_eq!(result, Err(GenError::NameCollision { identity: "ins_valid".to_string() }));
    }

    #[test]
    fn ports_must_carry_the_extra_signals() {
        let id = InstanceId::new("merge0").unwrap();
        let result = generate_concat_signal_manager(
            &id,
            &[PortGroup::new("ins", 8, ExtraSignals::default())],
            &[PortGroup::new("outs", 8, tag())],
            &tag(),
            |inner, width| opaque(inner, "ins", 1, width, 0),
        );
        assert!(matches!(result, Err(GenError::InvalidParameter { .. })));
    }

    #[test]
    fn combined_width_overflow_is_an_error() {
        let id = InstanceId::new("merge0").unwrap();
        let mut called = false;
        let result = generate_concat_signal_manager(
            &id,
            &[PortGroup::new("ins", u32::MAX, tag())],
            &[PortGroup::new("outs", u32::MAX, tag())],
            &tag(),
            |inner, width| {
                called = true;
                opaque(inner, "ins", 1, width, 0)
            },
        );
        assert!(matches!(result, Err(GenError::InvalidParameter { key, .. }) if key == "bitwidth"));
        assert!(!called);
    }

    proptest! {
        #[test]
        fn bus_round_trip(data in any::<u16>(), tags in 0u128..16, out_bus in 0u128..1024) {
            let artifact = merge_wrapper(8);
            let mut eval = Evaluator::new(artifact.top().unwrap().module());
            eval.set("ins", u128::from(data));
            eval.set("ins_tag", tags);
            eval.set("outs_inner", out_bus);
            eval.settle();

            let layout = SliceBounds::new(8, &tag()).unwrap();
            let bus = eval.get("ins_inner");
            for channel in 0..2 {
                let fields = layout.unpack((bus >> (channel * 10)) & 0x3ff).unwrap();
                prop_assert_eq!(fields, vec![(u128::from(data) >> (channel * 8)) & 0xff, (tags >> (channel * 2)) & 0x3]);
            }
            let fields = layout.unpack(out_bus).unwrap();
            prop_assert_eq!(vec![eval.get("outs"), eval.get("outs_tag")], fields);
        }
    }
}
