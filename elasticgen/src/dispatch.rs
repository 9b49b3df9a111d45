//! Variant dispatch.
//!
//! Every unit kind is generated in one of three shapes. Non-empty extra signals always select the
//! signal-managed shape; otherwise the primary bitwidth decides between dataless and scalar.

use std::fmt;

use tracing::debug;

use crate::error::GenError;
use crate::params::{ExtraSignals, ParamKey, ParamMap};

/// Generation shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Zero-width payload, valid/ready only.
    Dataless,
    /// Payload without extra signals.
    Scalar,
    /// Extra signals present; the unit is wrapped by a signal manager.
    SignalManaged,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Dataless => "dataless",
            Shape::Scalar => "scalar",
            Shape::SignalManaged => "signal-managed",
        })
    }
}

/// Shapes a unit kind can be generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeSupport {
    /// Dataless form exists.
    pub dataless: bool,
    /// Scalar form exists.
    pub scalar: bool,
    /// Signal-managed form exists.
    pub signal_managed: bool,
}

impl ShapeSupport {
    /// Supports every shape.
    pub const ALL: Self = Self { dataless: true, scalar: true, signal_managed: true };

    /// Operators that always carry data.
    pub const DATA_ONLY: Self = Self { dataless: false, scalar: true, signal_managed: true };

    /// Returns `true` if `shape` is supported.
    pub fn supports(self, shape: Shape) -> bool {
        match shape {
            Shape::Dataless => self.dataless,
            Shape::Scalar => self.scalar,
            Shape::SignalManaged => self.signal_managed,
        }
    }
}

/// Selected generation strategy, carrying only what the strategy needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Valid/ready only.
    Dataless,

    /// Payload of `bitwidth > 0` bits.
    Scalar {
        /// Payload width.
        bitwidth: u32,
    },

    /// Payload of `bitwidth >= 0` bits plus non-empty extra signals.
    SignalManaged {
        /// Payload width.
        bitwidth: u32,
        /// Extra signals, never empty.
        extra_signals: ExtraSignals,
    },
}

impl Variant {
    /// Tag of the variant.
    pub fn shape(&self) -> Shape {
        match self {
            Variant::Dataless => Shape::Dataless,
            Variant::Scalar { .. } => Shape::Scalar,
            Variant::SignalManaged { .. } => Shape::SignalManaged,
        }
    }
}

/// Selects exactly one variant for a unit of `kind`.
pub fn dispatch(
    kind: &str, support: ShapeSupport, bitwidth: u32, extra_signals: ExtraSignals,
) -> Result<Variant, GenError> {
    let variant = if !extra_signals.is_empty() {
        Variant::SignalManaged { bitwidth, extra_signals }
    } else if bitwidth == 0 {
        Variant::Dataless
    } else {
        Variant::Scalar { bitwidth }
    };

    let shape = variant.shape();
    if !support.supports(shape) {
        return Err(GenError::UnsupportedVariantCombination { kind: kind.to_string(), shape });
    }

    debug!(kind, %shape, bitwidth, "dispatched");
    Ok(variant)
}

/// Reads the payload width from `width_key` and the extra signals from `params`, then dispatches.
pub fn dispatch_params(
    kind: &str, support: ShapeSupport, params: &ParamMap, width_key: ParamKey,
) -> Result<Variant, GenError> {
    dispatch(kind, support, params.count(width_key)?, params.extra_signals()?)
}
