//! Unit requests and their typed parameter schema.
//!
//! Parameters arrive as a loosely-typed, insertion-ordered map (usually deserialized from JSON).
//! Generators never look keys up as raw strings: they read a [`ParamMap`] through the typed
//! accessors below, which reject missing keys, wrong types and negative numbers with
//! [`GenError::InvalidParameter`] once, at the request boundary.

use std::fmt;

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::some_or;
use crate::utils::is_identifier;

/// Recognized parameter keys.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Size,
    NumSlots,
    Transparent,
    BufferType,
    Value,
    Latency,
    Predicate,
    AbstractData,
    IsDouble,
    Bitwidth,
    InputBitwidth,
    OutputBitwidth,
    DataBitwidth,
    IndexBitwidth,
    AddrBitwidth,
    ExtraSignals,
}

impl ParamKey {
    /// Key as it appears in a serialized parameter map.
    pub const fn as_str(self) -> &'static str {
        match self {
            ParamKey::Size => "size",
            ParamKey::NumSlots => "num_slots",
            ParamKey::Transparent => "transparent",
            ParamKey::BufferType => "buffer_type",
            ParamKey::Value => "value",
            ParamKey::Latency => "latency",
            ParamKey::Predicate => "predicate",
            ParamKey::AbstractData => "abstract_data",
            ParamKey::IsDouble => "is_double",
            ParamKey::Bitwidth => "bitwidth",
            ParamKey::InputBitwidth => "input_bitwidth",
            ParamKey::OutputBitwidth => "output_bitwidth",
            ParamKey::DataBitwidth => "data_bitwidth",
            ParamKey::IndexBitwidth => "index_bitwidth",
            ParamKey::AddrBitwidth => "addr_bitwidth",
            ParamKey::ExtraSignals => "extra_signals",
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Raw parameter value.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Signals(LinkedHashMap<String, i64>),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Str(_) => "string",
            ParamValue::Signals(_) => "signal map",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self { ParamValue::Bool(value) }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self { ParamValue::Int(value) }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self { ParamValue::Int(i64::from(value)) }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self { ParamValue::Str(value.to_string()) }
}

impl From<&ExtraSignals> for ParamValue {
    fn from(value: &ExtraSignals) -> Self {
        ParamValue::Signals(value.iter().map(|signal| (signal.name.clone(), i64::from(signal.bitwidth))).collect())
    }
}

/// Insertion-ordered parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap {
    entries: LinkedHashMap<String, ParamValue>,
}

impl ParamMap {
    /// Creates an empty parameter map.
    pub fn new() -> Self { Self::default() }

    /// Adds or replaces `key`.
    #[must_use]
    pub fn with<V: Into<ParamValue>>(mut self, key: ParamKey, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds or replaces `key`.
    pub fn insert<V: Into<ParamValue>>(&mut self, key: ParamKey, value: V) {
        let _ = self.entries.insert(key.as_str().to_string(), value.into());
    }

    /// Returns the raw value of `key`.
    pub fn get(&self, key: ParamKey) -> Option<&ParamValue> { self.entries.get(key.as_str()) }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: ParamKey) -> bool { self.entries.contains_key(key.as_str()) }

    fn require(&self, key: ParamKey) -> Result<&ParamValue, GenError> {
        self.get(key).ok_or_else(|| GenError::invalid(key.as_str(), "missing"))
    }

    /// Non-negative integer parameter (channel counts, bitwidths, latencies).
    pub fn count(&self, key: ParamKey) -> Result<u32, GenError> {
        match self.require(key)? {
            ParamValue::Int(value) => {
                u32::try_from(*value).map_err(|_| GenError::invalid(key.as_str(), format!("{} is out of range", value)))
            }
            other => Err(GenError::invalid(key.as_str(), format!("expected integer, found {}", other.type_name()))),
        }
    }

    /// Like [`ParamMap::count`], with a default for absent keys.
    pub fn count_or(&self, key: ParamKey, default: u32) -> Result<u32, GenError> {
        if self.contains(key) {
            self.count(key)
        } else {
            Ok(default)
        }
    }

    /// Boolean parameter. The integers 0 and 1 are accepted as well.
    pub fn flag(&self, key: ParamKey) -> Result<bool, GenError> {
        match self.require(key)? {
            ParamValue::Bool(value) => Ok(*value),
            ParamValue::Int(0) => Ok(false),
            ParamValue::Int(1) => Ok(true),
            other => Err(GenError::invalid(key.as_str(), format!("expected boolean, found {:?}", other))),
        }
    }

    /// Like [`ParamMap::flag`], with a default for absent keys.
    pub fn flag_or(&self, key: ParamKey, default: bool) -> Result<bool, GenError> {
        if self.contains(key) {
            self.flag(key)
        } else {
            Ok(default)
        }
    }

    /// String parameter.
    pub fn string(&self, key: ParamKey) -> Result<&str, GenError> {
        match self.require(key)? {
            ParamValue::Str(value) => Ok(value),
            other => Err(GenError::invalid(key.as_str(), format!("expected string, found {}", other.type_name()))),
        }
    }

    /// Extra signals. Absent means no extra signals.
    pub fn extra_signals(&self) -> Result<ExtraSignals, GenError> {
        let value = some_or!(self.get(ParamKey::ExtraSignals), return Ok(ExtraSignals::default()));
        match value {
            ParamValue::Signals(signals) => {
                ExtraSignals::from_pairs(signals.iter().map(|(name, bitwidth)| (name.as_str(), *bitwidth)))
            }
            other => Err(GenError::invalid(
                ParamKey::ExtraSignals.as_str(),
                format!("expected signal map, found {}", other.type_name()),
            )),
        }
    }
}

/// Floating-point precision selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// IEEE-754 binary32.
    Single,
    /// IEEE-754 binary64.
    Double,
}

impl Precision {
    /// Reads `is_double`.
    pub fn from_params(params: &ParamMap) -> Result<Self, GenError> {
        Ok(if params.flag(ParamKey::IsDouble)? { Precision::Double } else { Precision::Single })
    }

    /// Operand width.
    pub const fn bitwidth(self) -> u32 {
        match self {
            Precision::Single => 32,
            Precision::Double => 64,
        }
    }
}

/// Extra signal: metadata travelling alongside a data token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtraSignal {
    /// Signal name, used as port name suffix.
    pub name: String,
    /// Width in bits, at least 1.
    pub bitwidth: u32,
}

/// Ordered set of extra signals. The order is part of the bit layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExtraSignals {
    signals: Vec<ExtraSignal>,
}

impl ExtraSignals {
    /// Validates `(name, bitwidth)` pairs, keeping their order.
    pub fn from_pairs<'a, I: IntoIterator<Item = (&'a str, i64)>>(pairs: I) -> Result<Self, GenError> {
        let key = ParamKey::ExtraSignals.as_str();
        let mut signals: Vec<ExtraSignal> = Vec::new();
        for (name, bitwidth) in pairs {
            if !is_identifier(name) {
                return Err(GenError::invalid(key, format!("`{}` is not a valid signal name", name)));
            }
            if signals.iter().any(|signal| signal.name == name) {
                return Err(GenError::invalid(key, format!("signal `{}` is declared twice", name)));
            }
            let bitwidth = u32::try_from(bitwidth)
                .ok()
                .filter(|bitwidth| *bitwidth > 0)
                .ok_or_else(|| GenError::invalid(key, format!("signal `{}` has bitwidth {}", name, bitwidth)))?;
            signals.push(ExtraSignal { name: name.to_string(), bitwidth });
        }
        if signals.iter().try_fold(0u32, |total, signal| total.checked_add(signal.bitwidth)).is_none() {
            return Err(GenError::invalid(key, "total bitwidth does not fit in 32 bits"));
        }
        Ok(Self { signals })
    }

    /// Returns `true` if there is no extra signal.
    pub fn is_empty(&self) -> bool { self.signals.is_empty() }

    /// Number of extra signals.
    pub fn len(&self) -> usize { self.signals.len() }

    /// Iterates in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExtraSignal> { self.signals.iter() }

    /// Sum of the signal widths. Construction guarantees it fits in `u32`.
    pub fn total_bitwidth(&self) -> u32 { self.signals.iter().map(|signal| signal.bitwidth).sum() }
}

impl<'a> IntoIterator for &'a ExtraSignals {
    type IntoIter = std::slice::Iter<'a, ExtraSignal>;
    type Item = &'a ExtraSignal;

    fn into_iter(self) -> Self::IntoIter { self.signals.iter() }
}

/// Request for one unit: kind, instance name and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRequest {
    /// Unit kind, e.g. `merge`.
    pub kind: String,
    /// Name of the generated top module.
    pub name: String,
    /// Parameters.
    #[serde(default)]
    pub params: ParamMap,
}

impl UnitRequest {
    /// Creates a request.
    pub fn new<K: Into<String>, N: Into<String>>(kind: K, name: N, params: ParamMap) -> Self {
        Self { kind: kind.into(), name: name.into(), params }
    }

    /// Parses a request from JSON, e.g. `{"kind": "merge", "name": "m0", "params": {"size": 2}}`.
    pub fn from_json(json: &str) -> Result<Self, GenError> {
        serde_json::from_str(json).map_err(|error| GenError::invalid("request", error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_reject_negative_and_mistyped_values() {
        let params = ParamMap::new()
            .with(ParamKey::Size, -1i64)
            .with(ParamKey::Bitwidth, true)
            .with(ParamKey::Latency, 4u32);

        assert!(matches!(params.count(ParamKey::Size), Err(GenError::InvalidParameter { key, .. }) if key == "size"));
        assert!(matches!(params.count(ParamKey::Bitwidth), Err(GenError::InvalidParameter { .. })));
        assert!(matches!(params.count(ParamKey::NumSlots), Err(GenError::InvalidParameter { reason, .. }) if reason == "missing"));
        assert_eq!(params.count(ParamKey::Latency), Ok(4));
        assert_eq!(params.count_or(ParamKey::NumSlots, 1), Ok(1));
    }

    #[test]
    fn flags_accept_zero_and_one() {
        let params = ParamMap::new().with(ParamKey::IsDouble, 1i64).with(ParamKey::Transparent, 2i64);
        assert_eq!(params.flag(ParamKey::IsDouble), Ok(true));
        assert!(params.flag(ParamKey::Transparent).is_err());
        assert_eq!(params.flag_or(ParamKey::AbstractData, false), Ok(false));
        assert_eq!(Precision::from_params(&params).map(Precision::bitwidth), Ok(64));
    }

    #[test]
    fn extra_signals_keep_declaration_order() {
        let request =
            UnitRequest::from_json(r#"{"kind": "merge", "name": "m", "params": {"extra_signals": {"spec": 1, "tag": 2}}}"#)
                .unwrap();
        let signals = request.params.extra_signals().unwrap();
        assert_eq!(signals.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["spec", "tag"]);
        assert_eq!(signals.total_bitwidth(), 3);

        let request =
            UnitRequest::from_json(r#"{"kind": "merge", "name": "m", "params": {"extra_signals": {"tag": 2, "spec": 1}}}"#)
                .unwrap();
        let signals = request.params.extra_signals().unwrap();
        assert_eq!(signals.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["tag", "spec"]);
    }

    #[test]
    fn extra_signals_are_validated() {
        assert!(ExtraSignals::from_pairs([("tag", 0)]).is_err());
        assert!(ExtraSignals::from_pairs([("tag", -2)]).is_err());
        assert!(ExtraSignals::from_pairs([("tag", 1), ("tag", 2)]).is_err());
        assert!(ExtraSignals::from_pairs([("1tag", 1)]).is_err());
        assert!(ExtraSignals::from_pairs([("wire", 1)]).is_err());
        let max = i64::from(u32::MAX);
        assert!(ExtraSignals::from_pairs([("spec", max), ("tag", 1)]).is_err());
        assert_eq!(ExtraSignals::from_pairs([("tag", max)]).map(|signals| signals.total_bitwidth()), Ok(u32::MAX));
        assert!(ParamMap::new().with(ParamKey::ExtraSignals, 3i64).extra_signals().is_err());
        assert!(ParamMap::new().extra_signals().unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_an_invalid_parameter() {
        assert!(matches!(UnitRequest::from_json("{"), Err(GenError::InvalidParameter { .. })));
        assert!(matches!(
            UnitRequest::from_json(r#"{"kind": "merge", "name": "m", "params": {"size": 1.5}}"#),
            Err(GenError::InvalidParameter { .. })
        ));
    }
}
