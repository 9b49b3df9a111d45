//! Verilog IR.
//!
//! Generators build modules out of these nodes; `to_string` renders them deterministically.

#[cfg(any(test, feature = "eval"))]
pub mod eval;
mod ir;

pub use ir::*;
