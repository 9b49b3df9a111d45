//! String attributes with a known set of values.

use std::str::FromStr;

/// A string attribute resolved against a closed set of known tags.
///
/// Values outside the set are kept verbatim instead of failing, so newer producers can pass tags
/// this crate does not know yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tagged<T> {
    /// One of the known tags.
    Known(T),
    /// Raw string that matched no known tag.
    Unrecognized(String),
}

impl<T> Tagged<T> {
    /// Returns the known tag, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Tagged::Known(tag) => Some(tag),
            Tagged::Unrecognized(_) => None,
        }
    }
}

/// Casts `raw` to a known tag, or passes it through.
pub fn parse_tag<T: FromStr>(raw: &str) -> Tagged<T> {
    match raw.parse::<T>() {
        Ok(tag) => Tagged::Known(tag),
        Err(_) => Tagged::Unrecognized(raw.to_string()),
    }
}
