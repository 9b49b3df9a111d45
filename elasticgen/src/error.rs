//! Generation errors.

use thiserror::Error;

use crate::dispatch::Shape;

/// Error raised while generating a unit.
///
/// Generation is fail-fast: the first error aborts the whole expansion and no partial artifact is
/// returned.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("invalid parameter `{key}`: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("unit kind `{kind}` has no {shape} variant")]
    UnsupportedVariantCombination { kind: String, shape: Shape },

    #[error("unit `{unit}` declares latency {declared} but its pipeline depth is {actual}")]
    LatencyMismatch { unit: String, declared: u32, actual: u32 },

    #[error("identity `{identity}` is defined more than once with different content")]
    NameCollision { identity: String },

    #[error("module `{module}` instantiates `{referenced}`, which is not defined before it")]
    UnresolvedReference { module: String, referenced: String },

    #[error("unknown unit kind `{0}`")]
    UnknownUnitKind(String),
}

impl GenError {
    /// Creates an `InvalidParameter` error.
    pub fn invalid<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        GenError::InvalidParameter { key: key.into(), reason: reason.into() }
    }

    /// Creates a `NameCollision` error.
    pub fn collision<I: ToString>(identity: I) -> Self { GenError::NameCollision { identity: identity.to_string() } }
}
