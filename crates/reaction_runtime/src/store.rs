// Graph Store - Copy-on-write owner of the current graph
//
// The store hands out `Arc<Graph>` snapshots. A mutation clones the graph
// only while a snapshot is still alive, so a background evaluation can read
// its snapshot while the editor keeps mutating.

use std::sync::Arc;

use reaction_types::{Node, NodeId, NodeKind, NodeState, Position};

use crate::error::GraphError;
use crate::evaluator::{Evaluation, Evaluator};
use crate::graph::Graph;
use crate::registry::NodeRegistry;

#[derive(Debug, Clone)]
pub struct GraphStore {
    registry: Arc<NodeRegistry>,
    graph: Arc<Graph>,
}

impl GraphStore {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            graph: Arc::new(Graph::new()),
        }
    }

    /// Store backed by the built-in specs
    pub fn builtin() -> Self {
        Self::new(Arc::new(NodeRegistry::builtin()))
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Current graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Immutable snapshot of the current graph
    pub fn snapshot(&self) -> Arc<Graph> {
        Arc::clone(&self.graph)
    }

    fn graph_mut(&mut self) -> &mut Graph {
        Arc::make_mut(&mut self.graph)
    }

    pub fn add_node(
        &mut self,
        kind: NodeKind,
        id: NodeId,
        name: &str,
        position: Position,
    ) -> Result<&Node, GraphError> {
        let registry = Arc::clone(&self.registry);
        self.graph_mut().add_node(&registry, kind, id, name, position)
    }

    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node, GraphError> {
        self.graph_mut().remove_node(id)
    }

    pub fn connect(&mut self, source: &NodeId, target: &NodeId, input: &str) -> Result<(), GraphError> {
        self.graph_mut().connect(source, target, input)
    }

    pub fn disconnect(&mut self, source: &NodeId, target: &NodeId, input: &str) -> Result<(), GraphError> {
        self.graph_mut().disconnect(source, target, input)
    }

    pub fn move_node(&mut self, id: &NodeId, dx: f32, dy: f32) -> Result<(), GraphError> {
        self.graph_mut().move_node(id, dx, dy)
    }

    pub fn set_node_position(&mut self, id: &NodeId, position: Position) -> Result<(), GraphError> {
        self.graph_mut().set_node_position(id, position)
    }

    pub fn update_state(&mut self, id: &NodeId, patch: NodeState) -> Result<(), GraphError> {
        self.graph_mut().update_state(id, patch)
    }

    pub fn select(&mut self, id: Option<&NodeId>) -> Result<(), GraphError> {
        self.graph_mut().select(id)
    }

    /// Write an evaluation's values into the current graph's output ports
    pub fn apply_evaluation(&mut self, evaluation: &Evaluation) {
        self.graph_mut().apply_evaluation(evaluation);
    }

    /// Evaluate the current graph and store the values in its output ports
    pub fn evaluate(&mut self) -> Evaluation {
        let evaluation = Evaluator::new(&self.registry).evaluate(&self.graph);
        self.apply_evaluation(&evaluation);
        evaluation
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::builtin()
    }
}
