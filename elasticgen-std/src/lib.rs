//! Standard library of handshake units.
//!
//! Every unit kind has a generator `generate_<kind>(id, params)` returning the unit's module
//! preceded by its dependencies. [`generate`] binds kind names to those generators.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::bare_urls)]
#![deny(unreachable_pub)]
//
#![allow(clippy::needless_lifetimes)]

use std::str::FromStr;

use elasticgen::signal_manager::generate_concat_signal_manager;
use elasticgen::*;
use tracing::debug;

pub mod buffers;
mod delay_buffer;
mod float;
mod join;
mod merge;
mod merge_notehb;
mod muli;
mod pipeline;

pub use buffers::{generate_buffer, generate_one_slot_break_dv, generate_one_slot_break_r, BufferType};
pub use delay_buffer::generate_delay_buffer;
pub use float::{generate_mulf, generate_subf};
pub use join::generate_join;
pub use merge::generate_merge;
pub use merge_notehb::generate_merge_notehb;
pub use muli::generate_muli;

/// Unit kinds known to [`generate`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Join,
    MergeNotehb,
    Merge,
    Buffer,
    OneSlotBreakR,
    OneSlotBreakDv,
    DelayBuffer,
    Muli,
    Mulf,
    Subf,
}

impl FromStr for UnitKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "join" => Self::Join,
            "merge_notehb" => Self::MergeNotehb,
            "merge" => Self::Merge,
            "buffer" => Self::Buffer,
            "one_slot_break_r" => Self::OneSlotBreakR,
            "one_slot_break_dv" => Self::OneSlotBreakDv,
            "delay_buffer" => Self::DelayBuffer,
            "muli" => Self::Muli,
            "mulf" => Self::Mulf,
            "subf" => Self::Subf,
            _ => return Err(()),
        })
    }
}

impl UnitKind {
    /// Generates a unit of this kind.
    pub fn generate(self, id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
        match self {
            Self::Join => generate_join(id, params),
            Self::MergeNotehb => generate_merge_notehb(id, params),
            Self::Merge => generate_merge(id, params),
            Self::Buffer => generate_buffer(id, params),
            Self::OneSlotBreakR => generate_one_slot_break_r(id, params),
            Self::OneSlotBreakDv => generate_one_slot_break_dv(id, params),
            Self::DelayBuffer => generate_delay_buffer(id, params),
            Self::Muli => generate_muli(id, params),
            Self::Mulf => generate_mulf(id, params),
            Self::Subf => generate_subf(id, params),
        }
    }
}

/// Generates the unit described by `request`.
pub fn generate(request: &UnitRequest) -> Result<Artifact, GenError> {
    let id = InstanceId::new(request.name.as_str())?;
    match parse_tag::<UnitKind>(&request.kind) {
        Tagged::Known(kind) => {
            debug!(kind = %request.kind, name = %request.name, "generating unit");
            kind.generate(&id, &request.params)
        }
        Tagged::Unrecognized(raw) => Err(GenError::UnknownUnitKind(raw)),
    }
}

/// Dispatches a unit that forwards its payload unchanged from `ins` to `outs`.
///
/// `generate` builds the dataless or scalar unit of the given payload width. With extra signals,
/// the same unit is built on the concatenated bus and wrapped by the concatenation signal manager.
/// `size` is the channel count of `ins`, if it is an array port.
pub(crate) fn generate_pass_through<G>(
    id: &InstanceId, kind: &str, params: &ParamMap, size: Option<u32>, generate: G,
) -> Result<Artifact, GenError>
where G: FnOnce(&InstanceId, u32) -> Result<Artifact, GenError> {
    match dispatch::dispatch_params(kind, ShapeSupport::ALL, params, ParamKey::Bitwidth)? {
        Variant::Dataless => generate(id, 0),
        Variant::Scalar { bitwidth } => generate(id, bitwidth),
        Variant::SignalManaged { bitwidth, extra_signals } => {
            let ins = PortGroup { name: "ins".to_string(), bitwidth, extra_signals: extra_signals.clone(), size };
            let outs = PortGroup::new("outs", bitwidth, extra_signals.clone());
            generate_concat_signal_manager(id, &[ins], &[outs], &extra_signals, generate)
        }
    }
}

/// Reads the channel count `size`, which must be positive.
pub(crate) fn channel_count(params: &ParamMap) -> Result<u32, GenError> {
    let size = params.count(ParamKey::Size)?;
    if size == 0 {
        return Err(GenError::invalid(ParamKey::Size.as_str(), "must be positive"));
    }
    Ok(size)
}
