//! One-slot elastic buffers.

use std::str::FromStr;

use elasticgen::*;
use tracing::debug;

mod one_slot_break_dv;
mod one_slot_break_r;

pub use one_slot_break_dv::generate_one_slot_break_dv;
pub(crate) use one_slot_break_dv::one_slot_break_dv;
pub use one_slot_break_r::generate_one_slot_break_r;
pub(crate) use one_slot_break_r::one_slot_break_r;

/// Buffer implementation selected by `buffer_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    /// `ONE_SLOT_BREAK_DV`: registered data and valid, latency 1.
    OneSlotBreakDv,
    /// `ONE_SLOT_BREAK_R`: registered ready, transparent while empty.
    OneSlotBreakR,
}

impl FromStr for BufferType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONE_SLOT_BREAK_DV" => Ok(Self::OneSlotBreakDv),
            "ONE_SLOT_BREAK_R" => Ok(Self::OneSlotBreakR),
            _ => Err(()),
        }
    }
}

impl BufferType {
    /// Reads `buffer_type`, falling back to `transparent` when it is absent. A transparent buffer
    /// breaks the ready path, an opaque one the data and valid paths.
    pub fn from_params(params: &ParamMap) -> Result<Self, GenError> {
        if !params.contains(ParamKey::BufferType) {
            let transparent = params.flag_or(ParamKey::Transparent, false)?;
            return Ok(if transparent { Self::OneSlotBreakR } else { Self::OneSlotBreakDv });
        }
        match parse_tag::<Self>(params.string(ParamKey::BufferType)?) {
            Tagged::Known(buffer_type) => Ok(buffer_type),
            Tagged::Unrecognized(raw) => {
                Err(GenError::invalid(ParamKey::BufferType.as_str(), format!("unsupported buffer type `{}`", raw)))
            }
        }
    }
}

/// Generates the buffer selected by `buffer_type`. `num_slots`, if given, must be 1.
pub fn generate_buffer(id: &InstanceId, params: &ParamMap) -> Result<Artifact, GenError> {
    let buffer_type = BufferType::from_params(params)?;
    let slots = params.count_or(ParamKey::NumSlots, 1)?;
    if slots != 1 {
        return Err(GenError::invalid(ParamKey::NumSlots.as_str(), format!("{:?} has one slot, not {}", buffer_type, slots)));
    }

    debug!(unit = %id, ?buffer_type, "selected buffer");
    match buffer_type {
        BufferType::OneSlotBreakDv => generate_one_slot_break_dv(id, params),
        BufferType::OneSlotBreakR => generate_one_slot_break_r(id, params),
    }
}
