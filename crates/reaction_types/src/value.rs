//! Native values carried by ports
//!
//! Each [`ValueType`] denotes exactly one native representation; [`Value`]
//! is the tagged union of those representations.

use serde::{Deserialize, Serialize};

use crate::ValueType;

/// A value produced by a node's output port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// UTF-8 string
    #[serde(rename = "string")]
    String(String),
    /// 64-bit floating point
    #[serde(rename = "number")]
    Number(f64),
    /// Ordered list of numbers
    #[serde(rename = "number[]")]
    NumberSequence(Vec<f64>),
    /// Anything else (dynamic JSON)
    #[serde(rename = "unknown")]
    Unknown(serde_json::Value),
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Accessors
// ─────────────────────────────────────────────────────────────────────────────

impl Value {
    /// The catalog type of this value
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Number(_) => ValueType::Number,
            Value::NumberSequence(_) => ValueType::NumberSequence,
            Value::Unknown(_) => ValueType::Unknown,
        }
    }

    /// Check if this value may be stored in a port declared as `declared`
    pub fn conforms_to(&self, declared: ValueType) -> bool {
        declared == ValueType::Unknown || self.value_type() == declared
    }

    /// Get as f64 (also reads numbers wrapped in `Unknown`)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Unknown(v) => v.as_f64(),
            _ => None,
        }
    }

    /// Get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Unknown(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Get as number slice
    pub fn as_sequence(&self) -> Option<&[f64]> {
        match self {
            Value::NumberSequence(seq) => Some(seq),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<f64>> for Value {
    fn from(seq: Vec<f64>) -> Self {
        Value::NumberSequence(seq)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::NumberSequence(seq) => {
                f.write_str("[")?;
                for (i, n) in seq.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", n)?;
                }
                f.write_str("]")
            }
            Value::Unknown(v) => write!(f, "{}", v),
        }
    }
}
