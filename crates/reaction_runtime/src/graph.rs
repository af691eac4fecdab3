// Graph Store - Node instances and the links between them
//
// The graph owns every node. Links live inside the ports: an input lists its
// upstream node ids in link order, an output holds the set of downstream ids.
// Invariants kept by every operation:
// - every id referenced by a port names a node in the graph
// - `target` is in `source.output.node_ids` iff some input of `target` lists `source`
// - a non-variadic input lists at most one upstream id
// Each operation validates everything before it mutates anything.

use std::collections::HashMap;

use serde::Serialize;

use reaction_types::{Node, NodeId, NodeKind, NodeState, Position};

use crate::error::{GraphError, Missing};
use crate::evaluator::Evaluation;
use crate::registry::NodeRegistry;

/// A directed edge from a node's output to another node's named input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub input: String,
}

/// All placed nodes, their insertion order and the current selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    selected: Option<NodeId>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Side
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a node by ID
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check if a node exists
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Node IDs in insertion order
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Every link, grouped by target in insertion order, then by input and link order
    pub fn links(&self) -> Vec<Link> {
        self.nodes()
            .flat_map(|node| {
                node.inputs.iter().flat_map(move |input| {
                    input.node_ids.iter().map(move |source| Link {
                        source: source.clone(),
                        target: node.id.clone(),
                        input: input.name.clone(),
                    })
                })
            })
            .collect()
    }

    /// Currently selected node
    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    /// Get node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn require(&self, id: &NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id).ok_or_else(|| GraphError::node_not_found(id))
    }

    fn require_mut(&mut self, id: &NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(id).ok_or_else(|| GraphError::node_not_found(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Instantiate a node through the registry and place it
    pub fn add_node(
        &mut self,
        registry: &NodeRegistry,
        kind: NodeKind,
        id: NodeId,
        name: &str,
        position: Position,
    ) -> Result<&Node, GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateIdentity(id));
        }

        let mut node = registry.create(kind, id.clone(), name)?;
        node.set_position(position.x, position.y);

        tracing::debug!(node_id = %id, kind = %kind, "Node added");
        self.order.push(id.clone());
        Ok(self.nodes.entry(id).or_insert(node))
    }

    /// Remove a node and sever every link touching it
    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node, GraphError> {
        let removed = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::node_not_found(id))?;
        self.order.retain(|n| n != id);

        for node in self.nodes.values_mut() {
            for input in &mut node.inputs {
                input.node_ids.retain(|n| n != id);
            }
            node.output.node_ids.remove(id);
        }

        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }

        tracing::debug!(node_id = %id, "Node removed");
        Ok(removed)
    }

    /// Link `source`'s output to `target`'s input named `input`.
    ///
    /// A non-variadic input that is already connected is rejected with
    /// [`GraphError::Cardinality`]; disconnect it first.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId, input: &str) -> Result<(), GraphError> {
        let source_type = self.require(source)?.output.value_type;
        let port = self
            .require(target)?
            .input(input)
            .ok_or_else(|| GraphError::NotFound(Missing::Input {
                node: target.clone(),
                input: input.to_string(),
            }))?;

        if !source_type.is_compatible_with(&port.value_type) {
            return Err(GraphError::TypeMismatch {
                source_type,
                target_type: port.value_type,
                target: target.clone(),
                input: input.to_string(),
            });
        }

        if !port.variadic {
            if let Some(existing) = port.node_ids.first() {
                return Err(GraphError::Cardinality {
                    target: target.clone(),
                    input: input.to_string(),
                    existing: existing.clone(),
                });
            }
        }

        if let Some(port) = self.require_mut(target)?.input_mut(input) {
            port.node_ids.push(source.clone());
        }
        self.require_mut(source)?.output.node_ids.insert(target.clone());

        tracing::debug!(source = %source, target = %target, input = input, "Nodes connected");
        Ok(())
    }

    /// Remove one link from `source` to `target`'s input named `input`.
    ///
    /// When the same source is linked more than once to a variadic input the
    /// most recent link is removed.
    pub fn disconnect(&mut self, source: &NodeId, target: &NodeId, input: &str) -> Result<(), GraphError> {
        self.require(source)?;
        let port = self
            .require(target)?
            .input(input)
            .ok_or_else(|| GraphError::NotFound(Missing::Input {
                node: target.clone(),
                input: input.to_string(),
            }))?;

        let position = port
            .node_ids
            .iter()
            .rposition(|n| n == source)
            .ok_or_else(|| GraphError::NotFound(Missing::Link {
                source: source.clone(),
                target: target.clone(),
                input: input.to_string(),
            }))?;

        let target_node = self.require_mut(target)?;
        if let Some(port) = target_node.input_mut(input) {
            port.node_ids.remove(position);
        }
        let still_linked = target_node.depends_on(source);

        if !still_linked {
            self.require_mut(source)?.output.node_ids.remove(target);
        }

        tracing::debug!(source = %source, target = %target, input = input, "Nodes disconnected");
        Ok(())
    }

    /// Move a node by a delta
    pub fn move_node(&mut self, id: &NodeId, dx: f32, dy: f32) -> Result<(), GraphError> {
        let node = self.require_mut(id)?;
        let position = node.position.translated(dx, dy);
        node.set_position(position.x, position.y);
        Ok(())
    }

    /// Place a node at an absolute position
    pub fn set_node_position(&mut self, id: &NodeId, position: Position) -> Result<(), GraphError> {
        self.require_mut(id)?.set_position(position.x, position.y);
        Ok(())
    }

    /// Merge a patch into a node's state
    pub fn update_state(&mut self, id: &NodeId, patch: NodeState) -> Result<(), GraphError> {
        self.require_mut(id)?.set_state(patch);
        tracing::debug!(node_id = %id, "Node state updated");
        Ok(())
    }

    /// Set or clear the selection
    pub fn select(&mut self, id: Option<&NodeId>) -> Result<(), GraphError> {
        if let Some(id) = id {
            self.require(id)?;
        }
        self.selected = id.cloned();
        Ok(())
    }

    /// Store each node's evaluated value in its output port (`None` on error)
    pub fn apply_evaluation(&mut self, evaluation: &Evaluation) {
        for (id, node) in self.nodes.iter_mut() {
            node.output.value = evaluation.value(id).cloned();
        }
    }
}
