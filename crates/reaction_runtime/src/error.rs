// Error types for registry, graph store and evaluation
//
// GraphError is returned synchronously by registry and graph operations.
// EvaluationError is a per-node outcome recorded in an Evaluation; it never
// aborts a pass.

use serde::Serialize;

use reaction_types::{NodeId, NodeKind, ValueType};

/// What a graph operation failed to find
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "missing", rename_all = "snake_case")]
pub enum Missing {
    Node {
        node: NodeId,
    },
    Input {
        node: NodeId,
        input: String,
    },
    Link {
        source: NodeId,
        target: NodeId,
        input: String,
    },
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Node { node } => write!(f, "node {}", node),
            Missing::Input { node, input } => write!(f, "input {}.{}", node, input),
            Missing::Link {
                source,
                target,
                input,
            } => write!(f, "link {} -> {}.{}", source, target, input),
        }
    }
}

/// Errors raised by registry and graph operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Node kind already registered: {0}")]
    DuplicateKind(NodeKind),

    #[error("Node kind not registered: {0}")]
    UnknownKind(NodeKind),

    #[error("Node identity already in use: {0}")]
    DuplicateIdentity(NodeId),

    #[error("Not found: {0}")]
    NotFound(Missing),

    #[error("Type mismatch: cannot connect {source_type} output to {target_type} input {target}.{input}")]
    TypeMismatch {
        source_type: ValueType,
        target_type: ValueType,
        target: NodeId,
        input: String,
    },

    #[error("Input {target}.{input} already connected to {existing}; disconnect it first")]
    Cardinality {
        target: NodeId,
        input: String,
        existing: NodeId,
    },
}

impl GraphError {
    pub(crate) fn node_not_found(node: &NodeId) -> Self {
        GraphError::NotFound(Missing::Node { node: node.clone() })
    }
}

/// Per-node evaluation failures
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum EvaluationError {
    /// The node sits on a dependency cycle
    #[error("Node is part of a dependency cycle")]
    Cycle,

    /// A required input has no value, or an upstream node failed.
    /// `node` is `None` when the input is not connected at all.
    #[error("{}", upstream_message(.input, .node))]
    Upstream {
        input: String,
        node: Option<NodeId>,
    },

    /// The node's own evaluation failed
    #[error("Evaluation failed: {message}")]
    Failed { message: String },
}

impl EvaluationError {
    /// Create a failure raised by a spec
    pub fn failed(message: impl Into<String>) -> Self {
        EvaluationError::Failed {
            message: message.into(),
        }
    }

    /// Check if this error was inherited rather than raised by the node itself
    pub fn is_upstream(&self) -> bool {
        matches!(self, EvaluationError::Upstream { .. })
    }
}

fn upstream_message(input: &str, node: &Option<NodeId>) -> String {
    match node {
        Some(node) => format!("Upstream node {} failed (input {})", node, input),
        None => format!("Required input {} is not connected", input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_messages() {
        let err = GraphError::NotFound(Missing::Input {
            node: NodeId::new("c"),
            input: "operands".to_string(),
        });
        assert_eq!(err.to_string(), "Not found: input c.operands");

        let err = GraphError::TypeMismatch {
            source_type: ValueType::String,
            target_type: ValueType::Number,
            target: NodeId::new("c"),
            input: "operands".to_string(),
        };
        assert!(err.to_string().contains("string output to number input"));
    }

    #[test]
    fn test_upstream_messages() {
        let err = EvaluationError::Upstream {
            input: "divisor".to_string(),
            node: None,
        };
        assert_eq!(err.to_string(), "Required input divisor is not connected");
        assert!(err.is_upstream());

        let err = EvaluationError::Upstream {
            input: "operands".to_string(),
            node: Some(NodeId::new("a")),
        };
        assert_eq!(err.to_string(), "Upstream node a failed (input operands)");
    }

    #[test]
    fn test_failed_helper() {
        let err = EvaluationError::failed("division by zero");
        assert_eq!(
            err,
            EvaluationError::Failed {
                message: "division by zero".to_string()
            }
        );
        assert!(!err.is_upstream());
    }
}
