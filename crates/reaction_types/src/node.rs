// Reaction Types - Node instance model
//
// A placed node: identity, position, typed input ports (possibly variadic),
// one typed output port and an opaque state blob. Ports reference other
// nodes by id only; the graph that owns the nodes keeps those references
// consistent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{NodeKind, Position, Value, ValueType};

/// Opaque per-node state; its shape is defined by the node's spec
pub type NodeState = serde_json::Map<String, serde_json::Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Node Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identifier of a node within a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ports
// ─────────────────────────────────────────────────────────────────────────────

/// An input port (fan-in)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPort {
    /// Stable identifier: "node_id.input_name"
    pub id: String,
    /// Port name (used in connections)
    pub name: String,
    /// Declared value type
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Whether the port accepts an ordered list of upstream nodes
    pub variadic: bool,
    /// Whether evaluation may proceed with nothing connected
    #[serde(default)]
    pub optional: bool,
    /// Upstream nodes, in link order
    pub node_ids: Vec<NodeId>,
}

impl InputPort {
    /// Create a port accepting at most one upstream node
    pub fn single(name: &str, value_type: ValueType) -> Self {
        Self {
            id: name.to_string(),
            name: name.to_string(),
            value_type,
            variadic: false,
            optional: false,
            node_ids: Vec::new(),
        }
    }

    /// Create a port accepting any number of upstream nodes
    pub fn variadic(name: &str, value_type: ValueType) -> Self {
        Self {
            variadic: true,
            ..Self::single(name, value_type)
        }
    }

    /// Mark the port optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Check if any upstream node is connected
    pub fn is_connected(&self) -> bool {
        !self.node_ids.is_empty()
    }

    /// Check if this port lists `node_id` among its upstream nodes
    pub fn references(&self, node_id: &NodeId) -> bool {
        self.node_ids.contains(node_id)
    }
}

/// The single output port of a node (fan-out)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPort {
    /// Declared value type
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Downstream consumers
    pub node_ids: BTreeSet<NodeId>,
    /// Last computed value; `None` if not evaluated yet or evaluation failed
    pub value: Option<Value>,
}

impl OutputPort {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            node_ids: BTreeSet::new(),
            value: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// A placed node instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID within the graph
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Node kind (selects the spec used for evaluation)
    pub kind: NodeKind,
    /// Position in the visual editor
    #[serde(default)]
    pub position: Position,
    /// Input ports in declaration order
    pub inputs: Vec<InputPort>,
    /// The output port
    pub output: OutputPort,
    /// Spec-defined state
    #[serde(default)]
    pub state: NodeState,
}

impl Node {
    /// Create a node template with no inputs and an empty state
    pub fn new(kind: NodeKind, output_type: ValueType) -> Self {
        Self {
            id: NodeId::new(""),
            name: String::new(),
            kind,
            position: Position::default(),
            inputs: Vec::new(),
            output: OutputPort::new(output_type),
            state: NodeState::new(),
        }
    }

    /// Add an input port
    pub fn with_input(mut self, input: InputPort) -> Self {
        self.inputs.push(input);
        self
    }

    /// Seed a state field
    pub fn with_state(mut self, key: &str, value: serde_json::Value) -> Self {
        self.state.insert(key.to_string(), value);
        self
    }

    /// Stamp identity and display name; input port ids follow the node id
    pub fn assign_identity(&mut self, id: NodeId, name: impl Into<String>) {
        for input in &mut self.inputs {
            input.id = format!("{}.{}", id, input.name);
        }
        self.id = id;
        self.name = name.into();
    }

    /// Unconditionally overwrite the position
    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Position { x, y };
    }

    /// Shallow field-by-field merge into the state, without validation
    pub fn set_state(&mut self, patch: NodeState) {
        for (key, value) in patch {
            self.state.insert(key, value);
        }
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&InputPort> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get a mutable input port by name
    pub fn input_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        self.inputs.iter_mut().find(|p| p.name == name)
    }

    /// Check if any input port lists `node_id`
    pub fn depends_on(&self, node_id: &NodeId) -> bool {
        self.inputs.iter().any(|p| p.references(node_id))
    }

    /// All upstream node IDs across inputs, deduplicated and sorted
    pub fn upstream_ids(&self) -> BTreeSet<NodeId> {
        self.inputs
            .iter()
            .flat_map(|p| p.node_ids.iter().cloned())
            .collect()
    }
}
