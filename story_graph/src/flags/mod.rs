//! Flag store - named story facts set by choices or by the DM.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flag value types.
///
/// Integers and floats are kept apart so that `3` survives a JSON round-trip as
/// `3`, but gates treat both as plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl FlagValue {
    /// Numeric view of the value, if it has one.
    ///
    /// Booleans count as `0`/`1`; strings only when they hold a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FlagValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FlagValue::Int(i) => Some(*i as f64),
            FlagValue::Float(f) if f.is_finite() => Some(*f),
            FlagValue::Float(_) => None,
            FlagValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Truthiness used by gates: non-zero numbers and non-empty strings are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(i) => *i != 0,
            FlagValue::Float(f) => *f != 0.0 && !f.is_nan(),
            FlagValue::String(s) => !s.is_empty(),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<i32> for FlagValue {
    fn from(value: i32) -> Self {
        FlagValue::Int(i64::from(value))
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Float(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::String(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::String(value)
    }
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Int(i) => write!(f, "{}", i),
            FlagValue::Float(x) => write!(f, "{}", x),
            FlagValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Mapping from flag name to value.
///
/// Ordered by name so two stores with the same contents always serialize to the
/// same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagStore {
    values: BTreeMap<String, FlagValue>,
}

impl FlagStore {
    /// Create an empty flag store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a flag by name.
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name)
    }

    /// Set a flag, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Option<FlagValue> {
        self.values.insert(name.into(), value.into())
    }

    /// Remove a flag, returning its value if it was set.
    pub fn remove(&mut self, name: &str) -> Option<FlagValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate flags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every flag.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl<K: Into<String>, V: Into<FlagValue>> FromIterator<(K, V)> for FlagStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
