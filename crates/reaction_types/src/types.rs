// Reaction Types - Type catalog and node kinds
//
// The value types a port can carry and the closed set of node kinds the
// editor knows about. Both enumerations are closed: adding a variant means
// touching every match on it.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Value Types
// ─────────────────────────────────────────────────────────────────────────────

/// Data types that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    /// UTF-8 string
    #[serde(rename = "string")]
    String,
    /// 64-bit floating point
    #[serde(rename = "number")]
    Number,
    /// Ordered list of numbers
    #[serde(rename = "number[]")]
    NumberSequence,
    /// Escape hatch: compatible with every other type
    #[serde(rename = "unknown")]
    Unknown,
}

impl ValueType {
    /// Every declared value type, in catalog order
    pub const ALL: [ValueType; 4] = [
        ValueType::String,
        ValueType::Number,
        ValueType::NumberSequence,
        ValueType::Unknown,
    ];

    /// Check if an output of this type may feed an input of `dest` type
    pub fn is_compatible_with(&self, dest: &ValueType) -> bool {
        match (self, dest) {
            // Exact match
            (a, b) if a == b => true,
            // Unknown accepts and is accepted by everything
            (ValueType::Unknown, _) | (_, ValueType::Unknown) => true,
            _ => false,
        }
    }

    /// Catalog name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::NumberSequence => "number[]",
            ValueType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-function form of [`ValueType::is_compatible_with`]
pub fn compatible(source: ValueType, dest: ValueType) -> bool {
    source.is_compatible_with(&dest)
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Number literal source
    Number,
    /// String literal source
    String,
    /// Sum of a variadic list of numbers
    Sum,
    /// First operand minus the remaining ones, in link order
    Subtract,
    /// Quotient of two numbers
    Divide,
    /// Concatenation of a variadic list of strings
    Concat,
    /// Collects numbers into a number sequence
    Sequence,
    /// Renders any value as text
    Display,
}

impl NodeKind {
    /// Every kind, in declaration order
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Number,
        NodeKind::String,
        NodeKind::Sum,
        NodeKind::Subtract,
        NodeKind::Divide,
        NodeKind::Concat,
        NodeKind::Sequence,
        NodeKind::Display,
    ];

    /// Kind identifier as used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Sum => "sum",
            NodeKind::Subtract => "subtract",
            NodeKind::Divide => "divide",
            NodeKind::Concat => "concat",
            NodeKind::Sequence => "sequence",
            NodeKind::Display => "display",
        }
    }

    /// Human-readable label (used for default node names)
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Number => "Number",
            NodeKind::String => "String",
            NodeKind::Sum => "Sum",
            NodeKind::Subtract => "Subtract",
            NodeKind::Divide => "Divide",
            NodeKind::Concat => "Concat",
            NodeKind::Sequence => "Sequence",
            NodeKind::Display => "Display",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node kind: {}", s))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canvas Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Position in the visual editor (for UI purposes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Offset by a delta
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_compatibility() {
        assert!(ValueType::Number.is_compatible_with(&ValueType::Number));
        assert!(ValueType::Unknown.is_compatible_with(&ValueType::String));
        assert!(ValueType::NumberSequence.is_compatible_with(&ValueType::Unknown));
        assert!(!ValueType::Number.is_compatible_with(&ValueType::NumberSequence));
        assert!(!ValueType::NumberSequence.is_compatible_with(&ValueType::Number));
        assert!(!ValueType::String.is_compatible_with(&ValueType::Number));
    }

    #[test]
    fn test_compatibility_is_total_and_symmetric() {
        for a in ValueType::ALL {
            for b in ValueType::ALL {
                let expected = a == b || a == ValueType::Unknown || b == ValueType::Unknown;
                assert_eq!(compatible(a, b), expected, "{} -> {}", a, b);
                assert_eq!(compatible(a, b), compatible(b, a));
            }
        }
    }

    #[test]
    fn test_value_type_serde_names() {
        let json = serde_json::to_string(&ValueType::NumberSequence).unwrap();
        assert_eq!(json, "\"number[]\"");
        let parsed: ValueType = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(parsed, ValueType::Unknown);
    }

    #[test]
    fn test_node_kind_parse() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("multiply".parse::<NodeKind>().is_err());
    }

    #[test]
    fn test_position_translated() {
        let p = Position::new(10.0, 20.0).translated(-5.0, 2.5);
        assert_eq!(p, Position::new(5.0, 22.5));
    }
}
