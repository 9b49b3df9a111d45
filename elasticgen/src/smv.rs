//! Literal formatting for the SMV verification-model backend.

use std::fmt;

/// Scalar SMV type of a given bitwidth: `boolean` for one bit, an unsigned word otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmvScalarType {
    bitwidth: u32,
}

impl SmvScalarType {
    /// Creates the type of a `bitwidth`-bit signal.
    pub fn new(bitwidth: u32) -> Self { Self { bitwidth } }

    /// Bitwidth.
    pub fn bitwidth(self) -> u32 { self.bitwidth }

    /// Formats `value` as a constant of this type. For booleans any non-zero value is `TRUE`.
    pub fn format_constant(self, value: u128) -> String {
        if self.bitwidth == 1 {
            (if value != 0 { "TRUE" } else { "FALSE" }).to_string()
        } else {
            format!("0ud{}_{}", self.bitwidth, value)
        }
    }
}

impl fmt::Display for SmvScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bitwidth == 1 {
            f.write_str("boolean")
        } else {
            write!(f, "unsigned word [{}]", self.bitwidth)
        }
    }
}

/// Formats `value` as an SMV constant of `bitwidth` bits.
pub fn format_constant(bitwidth: u32, value: u128) -> String { SmvScalarType::new(bitwidth).format_constant(value) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans() {
        assert_eq!(format_constant(1, 1), "TRUE");
        assert_eq!(format_constant(1, 0), "FALSE");
        assert_eq!(SmvScalarType::new(1).to_string(), "boolean");
    }

    #[test]
    fn words() {
        assert_eq!(format_constant(8, 5), "0ud8_5");
        assert_eq!(format_constant(32, 0), "0ud32_0");
        assert_eq!(SmvScalarType::new(8).to_string(), "unsigned word [8]");
    }
}
