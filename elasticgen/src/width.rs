//! Port width arithmetic.
//!
//! A bus carrying a primary payload and extra signals is laid out least significant bit first:
//! the primary field occupies bits `[0, primary)`, then every extra signal follows in declaration
//! order. Both signal managers, on both the encode and the decode side, take their slice
//! boundaries from [`SliceBounds`], so the layout cannot drift between them.

use crate::error::GenError;
use crate::params::{ExtraSignals, ParamKey};

/// Width of a bus carrying `primary` bits plus all extra signals.
///
/// Fails with [`GenError::InvalidParameter`] on `bitwidth` if the sum does not fit in `u32`.
pub fn combined_width(primary: u32, extra_signals: &ExtraSignals) -> Result<u32, GenError> {
    primary.checked_add(extra_signals.total_bitwidth()).ok_or_else(|| {
        GenError::invalid(
            ParamKey::Bitwidth.as_str(),
            format!("{} bits plus {} extra bits overflow", primary, extra_signals.total_bitwidth()),
        )
    })
}

/// Field of a combined bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    /// Primary payload.
    Primary,
    /// Extra signal with the given name.
    Extra(String),
}

/// Contiguous bit range of one field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSlice {
    /// Field.
    pub field: Field,
    /// Least significant bit.
    pub lo: u32,
    /// Width in bits, never zero.
    pub width: u32,
}

impl FieldSlice {
    /// One past the most significant bit.
    pub fn hi(&self) -> u32 { self.lo + self.width }
}

/// Slice boundaries of every field of a combined bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SliceBounds {
    slices: Vec<FieldSlice>,
    total: u32,
}

impl SliceBounds {
    /// Computes the layout. A zero-width primary field is omitted.
    pub fn new(primary: u32, extra_signals: &ExtraSignals) -> Result<Self, GenError> {
        let total = combined_width(primary, extra_signals)?;
        let mut slices = Vec::with_capacity(extra_signals.len() + 1);
        let mut lo = 0;
        if primary > 0 {
            slices.push(FieldSlice { field: Field::Primary, lo, width: primary });
            lo += primary;
        }
        for signal in extra_signals {
            slices.push(FieldSlice { field: Field::Extra(signal.name.clone()), lo, width: signal.bitwidth });
            lo += signal.bitwidth;
        }
        debug_assert_eq!(lo, total);
        Ok(Self { slices, total })
    }

    /// Width of the whole bus.
    pub fn total(&self) -> u32 { self.total }

    /// Fields in layout order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldSlice> { self.slices.iter() }

    /// Slice of the given field.
    pub fn get(&self, field: &Field) -> Option<&FieldSlice> { self.slices.iter().find(|slice| &slice.field == field) }

    /// Packs field values, given in layout order, into one bus value.
    ///
    /// Bits of a value beyond its field width are dropped. Returns `None` if the bus is wider than
    /// 128 bits or the number of values does not match the number of fields.
    pub fn pack(&self, values: &[u128]) -> Option<u128> {
        if self.total > 128 || values.len() != self.slices.len() {
            return None;
        }
        Some(self.slices.iter().zip(values).fold(0, |bus, (slice, value)| bus | ((value & mask(slice.width)) << slice.lo)))
    }

    /// Splits a bus value into field values, in layout order. Returns `None` if the bus is wider
    /// than 128 bits.
    pub fn unpack(&self, bus: u128) -> Option<Vec<u128>> {
        if self.total > 128 {
            return None;
        }
        Some(self.slices.iter().map(|slice| (bus >> slice.lo) & mask(slice.width)).collect())
    }
}

impl<'a> IntoIterator for &'a SliceBounds {
    type IntoIter = std::slice::Iter<'a, FieldSlice>;
    type Item = &'a FieldSlice;

    fn into_iter(self) -> Self::IntoIter { self.slices.iter() }
}

fn mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}
