//! Evaluation Engine
//!
//! Computes a value (or an error) for every node of a graph snapshot.
//!
//! 1. Node A depends on node B iff some input of A lists B.
//! 2. Nodes on a dependency cycle (a strongly connected component with more
//!    than one node, or a self-link) are marked [`EvaluationError::Cycle`]
//!    and never evaluated.
//! 3. The remaining nodes form a DAG and are visited in topological order.
//!    Ready nodes are taken in `NodeId` order, so the result does not depend
//!    on insertion order.
//! 4. A failure poisons its downstream closure with
//!    [`EvaluationError::Upstream`]; siblings are unaffected.
//!
//! A pass visits each node at most once and always terminates.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use reaction_types::{Node, NodeId, Value};

use crate::error::EvaluationError;
use crate::graph::Graph;
use crate::registry::{NodeContext, NodeRegistry};

/// Outcome of evaluating one node
pub type NodeResult = Result<Value, EvaluationError>;

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation Result
// ─────────────────────────────────────────────────────────────────────────────

/// Per-node results of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    results: BTreeMap<NodeId, NodeResult>,
    order: Vec<NodeId>,
}

impl Evaluation {
    /// Result for a node
    pub fn result(&self, id: &NodeId) -> Option<&NodeResult> {
        self.results.get(id)
    }

    /// Value for a node, if it evaluated successfully
    pub fn value(&self, id: &NodeId) -> Option<&Value> {
        self.results.get(id).and_then(|r| r.as_ref().ok())
    }

    /// Error for a node, if it failed
    pub fn error(&self, id: &NodeId) -> Option<&EvaluationError> {
        self.results.get(id).and_then(|r| r.as_ref().err())
    }

    /// Nodes in the order they were evaluated (cyclic nodes excluded)
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// All results, sorted by node ID
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeResult)> {
        self.results.iter()
    }

    /// Number of nodes that did not produce a value
    pub fn failed_count(&self) -> usize {
        self.results.values().filter(|r| r.is_err()).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluator
// ─────────────────────────────────────────────────────────────────────────────

/// Evaluates graphs against a registry of specs
pub struct Evaluator<'r> {
    registry: &'r NodeRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r NodeRegistry) -> Self {
        Self { registry }
    }

    /// Run a full evaluation pass over `graph`
    pub fn evaluate(&self, graph: &Graph) -> Evaluation {
        let mut nodes: BTreeMap<&NodeId, &Node> = BTreeMap::new();
        for node in graph.nodes() {
            nodes.insert(&node.id, node);
        }

        // dependency -> dependents, and node -> dependencies
        let mut dependencies: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
        let mut dependents: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
        for (&id, &node) in &nodes {
            let deps: Vec<&NodeId> = node
                .inputs
                .iter()
                .flat_map(|input| input.node_ids.iter())
                .filter(|dep| nodes.contains_key(dep))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for &dep in &deps {
                dependents.entry(dep).or_default().push(id);
            }
            dependencies.insert(id, deps);
        }

        let cyclic = find_cyclic_nodes(&dependencies);

        let mut evaluation = Evaluation::default();
        for &id in &cyclic {
            evaluation.results.insert(id.clone(), Err(EvaluationError::Cycle));
        }

        // Kahn's algorithm over the acyclic remainder
        let mut in_degree: HashMap<&NodeId, usize> = HashMap::new();
        for (&id, deps) in &dependencies {
            if cyclic.contains(id) {
                continue;
            }
            let pending = deps.iter().filter(|dep| !cyclic.contains(*dep)).count();
            in_degree.insert(id, pending);
        }

        let mut ready: BTreeSet<&NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(&id, _)| id)
            .collect();

        while let Some(id) = ready.pop_first() {
            let node = nodes[id];
            let result = self.evaluate_node(node, &evaluation.results);
            match &result {
                Ok(value) => tracing::trace!(node_id = %id, value = %value, "Node evaluated"),
                Err(error) => tracing::trace!(node_id = %id, error = %error, "Node failed"),
            }
            evaluation.results.insert(id.clone(), result);
            evaluation.order.push(id.clone());

            for &dependent in dependents.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        tracing::debug!(
            nodes = evaluation.len(),
            failed = evaluation.failed_count(),
            cyclic = cyclic.len(),
            "Evaluation pass complete"
        );
        evaluation
    }

    /// Gather a node's inputs and run its spec
    fn evaluate_node(&self, node: &Node, results: &BTreeMap<NodeId, NodeResult>) -> NodeResult {
        let mut inputs = BTreeMap::new();
        for port in &node.inputs {
            if port.node_ids.is_empty() && !port.variadic && !port.optional {
                return Err(EvaluationError::Upstream {
                    input: port.name.clone(),
                    node: None,
                });
            }

            let mut values = Vec::with_capacity(port.node_ids.len());
            for upstream in &port.node_ids {
                match results.get(upstream) {
                    Some(Ok(value)) => values.push(value.clone()),
                    _ => {
                        return Err(EvaluationError::Upstream {
                            input: port.name.clone(),
                            node: Some(upstream.clone()),
                        });
                    }
                }
            }
            inputs.insert(port.name.clone(), values);
        }

        let spec = self.registry.get(node.kind).ok_or_else(|| {
            EvaluationError::failed(format!("no spec registered for kind {}", node.kind))
        })?;

        let ctx = NodeContext::new(&node.id, inputs, &node.state);
        let value = spec.evaluate(&ctx)?;

        if !value.conforms_to(node.output.value_type) {
            return Err(EvaluationError::failed(format!(
                "produced a {} value for a {} output",
                value.value_type(),
                node.output.value_type
            )));
        }
        Ok(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle Detection
// ─────────────────────────────────────────────────────────────────────────────

/// Nodes that sit on a dependency cycle (Tarjan's strongly connected components)
fn find_cyclic_nodes<'g>(edges: &BTreeMap<&'g NodeId, Vec<&'g NodeId>>) -> BTreeSet<&'g NodeId> {
    let mut tarjan = Tarjan {
        edges,
        next_index: 0,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        stack: Vec::new(),
        on_stack: HashSet::new(),
        cyclic: BTreeSet::new(),
    };

    for &id in edges.keys() {
        if !tarjan.index.contains_key(id) {
            tarjan.strong_connect(id);
        }
    }
    tarjan.cyclic
}

struct Tarjan<'a, 'g> {
    edges: &'a BTreeMap<&'g NodeId, Vec<&'g NodeId>>,
    next_index: usize,
    index: HashMap<&'g NodeId, usize>,
    lowlink: HashMap<&'g NodeId, usize>,
    stack: Vec<&'g NodeId>,
    on_stack: HashSet<&'g NodeId>,
    cyclic: BTreeSet<&'g NodeId>,
}

impl<'a, 'g> Tarjan<'a, 'g> {
    /// Iterative Tarjan from `root`; each frame is a node and the index of
    /// its next successor to visit
    fn strong_connect(&mut self, root: &'g NodeId) {
        let edges = self.edges;
        let mut frames: Vec<(&'g NodeId, usize)> = Vec::new();
        self.visit(root);
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let v = frame.0;
            let successors = edges.get(v).map(Vec::as_slice).unwrap_or(&[]);

            if let Some(&w) = successors.get(frame.1) {
                frame.1 += 1;
                if !self.index.contains_key(w) {
                    self.visit(w);
                    frames.push((w, 0));
                } else if self.on_stack.contains(w) {
                    let low = self.lowlink[v].min(self.index[w]);
                    self.lowlink.insert(v, low);
                }
                continue;
            }

            // all successors done
            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                let low = self.lowlink[parent].min(self.lowlink[v]);
                self.lowlink.insert(parent, low);
            }

            if self.lowlink[v] == self.index[v] {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack.remove(w);
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                let self_link = successors.contains(&v);
                if component.len() > 1 || self_link {
                    self.cyclic.extend(component);
                }
            }
        }
    }

    fn visit(&mut self, v: &'g NodeId) {
        self.index.insert(v, self.next_index);
        self.lowlink.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);
    }
}
