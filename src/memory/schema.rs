//! Typed memory values and the schema external edits are checked against

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{KernelError, Result};
use crate::spatial::hex::HexCoord;

/// A value stored under a memory key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MemoryValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Hex(HexCoord),
}

impl MemoryValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            MemoryValue::Bool(_) => ValueKind::Bool,
            MemoryValue::Int(_) => ValueKind::Int,
            MemoryValue::Float(_) => ValueKind::Float,
            MemoryValue::Text(_) => ValueKind::Text,
            MemoryValue::Hex(_) => ValueKind::Hex,
        }
    }

    pub fn as_hex(&self) -> Option<HexCoord> {
        match self {
            MemoryValue::Hex(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            MemoryValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for MemoryValue {
    fn from(s: &str) -> Self {
        MemoryValue::Text(s.to_string())
    }
}

impl From<bool> for MemoryValue {
    fn from(b: bool) -> Self {
        MemoryValue::Bool(b)
    }
}

impl From<i64> for MemoryValue {
    fn from(i: i64) -> Self {
        MemoryValue::Int(i)
    }
}

impl From<HexCoord> for MemoryValue {
    fn from(h: HexCoord) -> Self {
        MemoryValue::Hex(h)
    }
}

/// Type tag of a [`MemoryValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Hex,
}

/// Recognized keys for externally applied edits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySchema {
    fields: BTreeMap<String, ValueKind>,
}

impl MemorySchema {
    pub fn new(fields: BTreeMap<String, ValueKind>) -> Self {
        Self { fields }
    }

    pub fn with_field(mut self, key: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(key.into(), kind);
        self
    }

    pub fn kind_of(&self, key: &str) -> Option<ValueKind> {
        self.fields.get(key).copied()
    }

    /// Check one key/value pair against the schema
    pub fn check(&self, key: &str, value: &MemoryValue) -> Result<()> {
        match self.kind_of(key) {
            None => Err(KernelError::InvalidEdit(format!("unknown memory key '{}'", key))),
            Some(expected) if expected != value.kind() => Err(KernelError::InvalidEdit(format!(
                "key '{}' expects {:?}, got {:?}",
                key,
                expected,
                value.kind()
            ))),
            Some(_) => Ok(()),
        }
    }
}
