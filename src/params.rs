//! Named, typed task parameters.
//!
//! The surrounding storage model gives a task exactly one scalar field for
//! parameters, so the whole bag is encoded into a single string blob and
//! decoded again when the task is dispatched (possibly in a later process).

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ParamError;

/// A single parameter value.
///
/// Closed set of supported kinds. Anything the engine cannot round-trip is
/// unrepresentable here, so unsupported values are rejected when the bag is
/// built rather than when it is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    String(String),
    Bool(bool),
    Int(i64),
    Uri(Url),
}

impl ParamValue {
    /// The string value, if this is a string parameter.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uri(&self) -> Option<&Url> {
        match self {
            Self::Uri(u) => Some(u),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Url> for ParamValue {
    fn from(value: Url) -> Self {
        Self::Uri(value)
    }
}

/// One named entry in the bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ParamEntry {
    name: String,
    value: ParamValue,
}

/// Ordered collection of named parameters.
///
/// Names are unique within a bag; adding a name twice replaces the earlier
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    entries: Vec<ParamEntry>,
}

impl ParamBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `name`, replacing any existing value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(ParamEntry { name, value }),
        }
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }

    /// Look up a string parameter by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    pub fn get_uri(&self, name: &str) -> Option<&Url> {
        self.get(name).and_then(ParamValue::as_uri)
    }

    /// Names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the whole bag into one string blob.
    pub fn save(&self) -> Result<String, ParamError> {
        serde_json::to_string(&self.entries).map_err(|e| ParamError::Encode(e.to_string()))
    }

    /// Decode a blob produced by [`save`](Self::save).
    ///
    /// An unknown type tag or a malformed blob is a hard failure, never a
    /// silently empty value.
    pub fn load(blob: &str) -> Result<Self, ParamError> {
        let entries: Vec<ParamEntry> =
            serde_json::from_str(blob).map_err(|e| ParamError::Decode(e.to_string()))?;
        Ok(Self { entries })
    }
}
