// Node Spec Registry - Maps node kinds to their specs
//
// A spec is a stateless template for one node kind: it creates fresh node
// instances and evaluates them. The registry is built once at startup and
// shared by reference (`Arc<NodeRegistry>`) with the graph store and the
// evaluator; nothing mutates it afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use reaction_types::{Node, NodeId, NodeKind, NodeState, Value};

use crate::error::{EvaluationError, GraphError};
use crate::specs::builtin_spec;

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to a spec's `evaluate`
pub struct NodeContext<'a> {
    /// Node instance ID
    pub node_id: &'a NodeId,
    /// Resolved input values (input name -> values in link order)
    pub inputs: BTreeMap<String, Vec<Value>>,
    /// The node's internal state
    pub state: &'a NodeState,
}

impl<'a> NodeContext<'a> {
    /// Create a new node context
    pub fn new(
        node_id: &'a NodeId,
        inputs: BTreeMap<String, Vec<Value>>,
        state: &'a NodeState,
    ) -> Self {
        Self {
            node_id,
            inputs,
            state,
        }
    }

    /// Get the values of an input (empty when nothing is connected)
    pub fn get_input(&self, name: &str) -> &[Value] {
        self.inputs.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get the single value of a non-variadic input
    pub fn get_single(&self, name: &str) -> Option<&Value> {
        self.get_input(name).first()
    }

    /// Get every value of an input as f64
    pub fn get_numbers(&self, name: &str) -> Result<Vec<f64>, EvaluationError> {
        self.get_input(name)
            .iter()
            .map(|v| {
                v.as_number().ok_or_else(|| {
                    EvaluationError::failed(format!("input {} expects numbers, got {}", name, v))
                })
            })
            .collect()
    }

    /// Get the single value of an input as f64
    pub fn get_number(&self, name: &str) -> Result<f64, EvaluationError> {
        let value = self
            .get_single(name)
            .ok_or_else(|| EvaluationError::failed(format!("input {} has no value", name)))?;
        value.as_number().ok_or_else(|| {
            EvaluationError::failed(format!("input {} expects a number, got {}", name, value))
        })
    }

    /// Get every value of an input as a string slice
    pub fn get_strings(&self, name: &str) -> Result<Vec<&str>, EvaluationError> {
        self.get_input(name)
            .iter()
            .map(|v| {
                v.as_str().ok_or_else(|| {
                    EvaluationError::failed(format!("input {} expects strings, got {}", name, v))
                })
            })
            .collect()
    }

    /// Get a state field
    pub fn get_state(&self, key: &str) -> Option<&serde_json::Value> {
        self.state.get(key)
    }

    /// Get a state field as f64
    pub fn get_state_number(&self, key: &str) -> Option<f64> {
        self.state.get(key).and_then(|v| v.as_f64())
    }

    /// Get a state field as string
    pub fn get_state_string(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(|v| v.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Spec Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Template for one node kind
pub trait NodeSpec: Send + Sync {
    /// Create a fresh node. The registry overwrites identity and name on the
    /// returned node, so implementations must not rely on them being kept.
    fn create(&self, id: NodeId, name: &str) -> Node;

    /// Compute the node's output from its resolved inputs and state
    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError>;
}

/// Function-based node spec (for simple nodes and tests)
pub struct FnNodeSpec<C, E>
where
    C: Fn() -> Node + Send + Sync,
    E: Fn(&NodeContext<'_>) -> Result<Value, EvaluationError> + Send + Sync,
{
    template: C,
    evaluate: E,
}

impl<C, E> FnNodeSpec<C, E>
where
    C: Fn() -> Node + Send + Sync,
    E: Fn(&NodeContext<'_>) -> Result<Value, EvaluationError> + Send + Sync,
{
    pub fn new(template: C, evaluate: E) -> Self {
        Self { template, evaluate }
    }
}

impl<C, E> NodeSpec for FnNodeSpec<C, E>
where
    C: Fn() -> Node + Send + Sync,
    E: Fn(&NodeContext<'_>) -> Result<Value, EvaluationError> + Send + Sync,
{
    fn create(&self, id: NodeId, name: &str) -> Node {
        let mut node = (self.template)();
        node.assign_identity(id, name);
        node
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        (self.evaluate)(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of node specs, keyed by kind
pub struct NodeRegistry {
    specs: HashMap<NodeKind, Arc<dyn NodeSpec>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in spec of every kind
    pub fn builtin() -> Self {
        let specs = NodeKind::ALL
            .iter()
            .map(|&kind| (kind, builtin_spec(kind)))
            .collect();
        Self { specs }
    }

    /// Register a spec for a kind
    pub fn register(&mut self, kind: NodeKind, spec: Arc<dyn NodeSpec>) -> Result<(), GraphError> {
        if self.specs.contains_key(&kind) {
            return Err(GraphError::DuplicateKind(kind));
        }
        self.specs.insert(kind, spec);
        tracing::debug!(kind = %kind, "Registered node spec");
        Ok(())
    }

    /// Register a spec built from a node template and an evaluate function
    pub fn register_fn<C, E>(&mut self, kind: NodeKind, template: C, evaluate: E) -> Result<(), GraphError>
    where
        C: Fn() -> Node + Send + Sync + 'static,
        E: Fn(&NodeContext<'_>) -> Result<Value, EvaluationError> + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(FnNodeSpec::new(template, evaluate)))
    }

    /// Instantiate a node of `kind` with the caller's identity and name
    pub fn create(&self, kind: NodeKind, id: NodeId, name: &str) -> Result<Node, GraphError> {
        let spec = self.specs.get(&kind).ok_or(GraphError::UnknownKind(kind))?;
        let mut node = spec.create(id.clone(), name);
        node.kind = kind;
        node.assign_identity(id, name);
        Ok(node)
    }

    /// Get the spec of a kind
    pub fn get(&self, kind: NodeKind) -> Option<&dyn NodeSpec> {
        self.specs.get(&kind).map(|spec| &**spec)
    }

    /// All registered kinds, sorted
    pub fn kinds(&self) -> Vec<NodeKind> {
        let mut kinds: Vec<_> = self.specs.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Check if a kind is registered
    pub fn contains(&self, kind: NodeKind) -> bool {
        self.specs.contains_key(&kind)
    }

    /// Get spec count
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
