//! Editor Session
//!
//! The operations a graph editor front end drives: placing, dragging,
//! connecting, selecting and editing nodes, plus evaluation scheduling.
//!
//! `EditorSession` is a cheap handle (`Clone`) over shared state, so it can
//! be moved into tasks. Every successful edit other than selection bumps a
//! generation counter; a background evaluation publishes its result only if
//! the generation is still the one its snapshot was taken at.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use reaction_types::{NodeId, NodeKind, NodeState, Position, Value};
use reaction_runtime::{Evaluation, Evaluator, Graph, GraphError, GraphStore, NodeRegistry};

use crate::config::SessionConfig;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Evaluation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Shared editor session
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    /// Graph store and naming counters
    editor: Mutex<EditorState>,

    /// Last published evaluation
    results: RwLock<Option<Arc<Evaluation>>>,

    /// Bumped on every successful edit except selection
    generation: AtomicU64,

    auto_evaluate: bool,
}

struct EditorState {
    store: GraphStore,
    /// Nodes placed so far per kind, for display names ("Sum 2")
    counters: HashMap<NodeKind, u64>,
}

/// A background evaluation that has been started but not yet published
pub struct PendingEvaluation {
    generation: u64,
    handle: JoinHandle<Evaluation>,
}

impl PendingEvaluation {
    /// Generation of the snapshot being evaluated
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl EditorSession {
    /// Create a session over the given registry
    pub fn new(registry: Arc<NodeRegistry>, config: &SessionConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                editor: Mutex::new(EditorState {
                    store: GraphStore::new(registry),
                    counters: HashMap::new(),
                }),
                results: RwLock::new(None),
                generation: AtomicU64::new(0),
                auto_evaluate: config.session.auto_evaluate,
            }),
        }
    }

    /// Create a session backed by the built-in specs
    pub fn builtin(config: &SessionConfig) -> Self {
        Self::new(Arc::new(NodeRegistry::builtin()), config)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Place a new node; the session picks its id and display name
    pub fn place_node(&self, kind: NodeKind, position: Position) -> Result<NodeId, SessionError> {
        self.mutate(|editor| {
            let counter = editor.counters.entry(kind).or_insert(0);
            let name = format!("{} {}", kind.label(), *counter + 1);
            let id = NodeId::new(Uuid::new_v4().to_string());

            editor.store.add_node(kind, id.clone(), &name, position)?;
            *counter += 1;
            debug!(node_id = %id, name = %name, "Node placed");
            Ok(id)
        })
    }

    /// Drop a dragged node at an absolute position
    pub fn drag_node(&self, id: &NodeId, position: Position) -> Result<(), SessionError> {
        self.mutate(|editor| Ok(editor.store.set_node_position(id, position)?))
    }

    /// Move a node by a delta
    pub fn move_node(&self, id: &NodeId, dx: f32, dy: f32) -> Result<(), SessionError> {
        self.mutate(|editor| Ok(editor.store.move_node(id, dx, dy)?))
    }

    /// Finish a drag from `source`'s output onto `target`'s input
    pub fn complete_connection(
        &self,
        source: &NodeId,
        target: &NodeId,
        input: &str,
    ) -> Result<(), SessionError> {
        self.mutate(|editor| Ok(editor.store.connect(source, target, input)?))
    }

    pub fn disconnect(&self, source: &NodeId, target: &NodeId, input: &str) -> Result<(), SessionError> {
        self.mutate(|editor| Ok(editor.store.disconnect(source, target, input)?))
    }

    /// Select a node, or clear the selection with `None`.
    ///
    /// Selection does not affect values, so it neither bumps the generation
    /// nor triggers evaluation.
    pub fn click(&self, id: Option<&NodeId>) -> Result<(), SessionError> {
        self.inner.editor.lock().store.select(id)?;
        Ok(())
    }

    pub fn remove_node(&self, id: &NodeId) -> Result<(), SessionError> {
        self.mutate(|editor| {
            editor.store.remove_node(id)?;
            Ok(())
        })
    }

    /// Merge a patch into a node's state
    pub fn edit_state(&self, id: &NodeId, patch: NodeState) -> Result<(), SessionError> {
        self.mutate(|editor| Ok(editor.store.update_state(id, patch)?))
    }

    /// Apply a mutation under the editor lock; on success bump the
    /// generation and auto-evaluate if enabled
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut EditorState) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut editor = self.inner.editor.lock();
        let output = f(&mut *editor)?;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if self.inner.auto_evaluate {
            self.evaluate_locked(&mut *editor);
        }
        Ok(output)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Side
    // ─────────────────────────────────────────────────────────────────────────

    /// Immutable snapshot of the current graph
    pub fn snapshot(&self) -> Arc<Graph> {
        self.inner.editor.lock().store.snapshot()
    }

    /// Last published evaluation
    pub fn results(&self) -> Option<Arc<Evaluation>> {
        self.inner.results.read().clone()
    }

    /// A node's value in the last published evaluation
    pub fn value_of(&self, id: &NodeId) -> Option<Value> {
        self.inner
            .results
            .read()
            .as_ref()
            .and_then(|evaluation| evaluation.value(id).cloned())
    }

    /// Current mutation generation
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Evaluation
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluate on the caller's thread and publish the result
    pub fn evaluate_now(&self) -> Arc<Evaluation> {
        let mut editor = self.inner.editor.lock();
        self.evaluate_locked(&mut *editor)
    }

    fn evaluate_locked(&self, editor: &mut EditorState) -> Arc<Evaluation> {
        let evaluation = Arc::new(editor.store.evaluate());
        *self.inner.results.write() = Some(Arc::clone(&evaluation));
        evaluation
    }

    /// Evaluate a snapshot on a blocking worker. Returns whether the result
    /// was published; it is discarded if the graph changed in the meantime.
    pub async fn evaluate_in_background(&self) -> Result<bool, SessionError> {
        let pending = self.start_background_evaluation();
        self.finish_background_evaluation(pending).await
    }

    /// Snapshot the graph and start evaluating it on a blocking worker
    pub fn start_background_evaluation(&self) -> PendingEvaluation {
        let editor = self.inner.editor.lock();
        let snapshot = editor.store.snapshot();
        let registry = Arc::clone(editor.store.registry());
        let generation = self.generation();
        drop(editor);

        debug!(generation, "Background evaluation started");
        let handle = tokio::task::spawn_blocking(move || Evaluator::new(&registry).evaluate(&snapshot));
        PendingEvaluation { generation, handle }
    }

    /// Wait for a background pass and publish it unless it is stale
    pub async fn finish_background_evaluation(
        &self,
        pending: PendingEvaluation,
    ) -> Result<bool, SessionError> {
        let evaluation = pending.handle.await?;

        let mut editor = self.inner.editor.lock();
        let current = self.generation();
        if current != pending.generation {
            debug!(
                started = pending.generation,
                current, "Discarding stale background evaluation"
            );
            return Ok(false);
        }

        editor.store.apply_evaluation(&evaluation);
        *self.inner.results.write() = Some(Arc::new(evaluation));
        debug!(generation = current, "Background evaluation published");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reaction_runtime::{EvaluationError, Missing};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn manual() -> SessionConfig {
        let mut config = SessionConfig::default();
        config.session.auto_evaluate = false;
        config
    }

    fn number(session: &EditorSession, value: f64) -> NodeId {
        let id = assert_ok!(session.place_node(NodeKind::Number, Position::default()));
        let mut patch = NodeState::new();
        patch.insert("value".to_string(), json!(value));
        assert_ok!(session.edit_state(&id, patch));
        id
    }

    #[test]
    fn test_place_node_names_per_kind() {
        let session = EditorSession::builtin(&manual());
        let a = assert_ok!(session.place_node(NodeKind::Number, Position::new(1.0, 2.0)));
        let b = assert_ok!(session.place_node(NodeKind::Number, Position::default()));
        let c = assert_ok!(session.place_node(NodeKind::Sum, Position::default()));
        assert_ne!(a, b);

        let graph = session.snapshot();
        assert_eq!(graph.node(&a).unwrap().name, "Number 1");
        assert_eq!(graph.node(&b).unwrap().name, "Number 2");
        assert_eq!(graph.node(&c).unwrap().name, "Sum 1");
        assert_eq!(graph.node(&a).unwrap().position, Position::new(1.0, 2.0));
        assert_eq!(graph.node_ids(), &[a, b, c]);
    }

    #[test]
    fn test_place_unregistered_kind_keeps_counter() {
        let session = EditorSession::new(Arc::new(NodeRegistry::new()), &manual());
        let err = assert_err!(session.place_node(NodeKind::Sum, Position::default()));
        assert!(matches!(err, SessionError::Graph(GraphError::UnknownKind(NodeKind::Sum))));
        assert_eq!(session.generation(), 0);
        assert!(session.snapshot().is_empty());
    }

    #[test]
    fn test_end_to_end_auto_evaluate() {
        let session = EditorSession::builtin(&SessionConfig::default());
        let a = number(&session, 3.0);
        let b = number(&session, 5.0);
        let c = assert_ok!(session.place_node(NodeKind::Sum, Position::default()));
        assert_ok!(session.complete_connection(&a, &c, "operands"));
        assert_ok!(session.complete_connection(&b, &c, "operands"));

        assert_eq!(session.value_of(&a), Some(Value::Number(3.0)));
        assert_eq!(session.value_of(&b), Some(Value::Number(5.0)));
        assert_eq!(session.value_of(&c), Some(Value::Number(8.0)));
        assert_eq!(
            session.snapshot().node(&c).unwrap().output.value,
            Some(Value::Number(8.0))
        );
    }

    #[test]
    fn test_manual_session_waits_for_evaluate_now() {
        let session = EditorSession::builtin(&manual());
        let a = number(&session, 4.0);
        assert!(session.results().is_none());

        let evaluation = session.evaluate_now();
        assert_eq!(evaluation.value(&a), Some(&Value::Number(4.0)));
        assert_eq!(session.value_of(&a), Some(Value::Number(4.0)));
    }

    #[test]
    fn test_rejected_mutation_does_not_bump_generation() {
        let session = EditorSession::builtin(&manual());
        let s = assert_ok!(session.place_node(NodeKind::String, Position::default()));
        let c = assert_ok!(session.place_node(NodeKind::Sum, Position::default()));
        let generation = session.generation();

        let err = assert_err!(session.complete_connection(&s, &c, "operands"));
        assert!(matches!(err, SessionError::Graph(GraphError::TypeMismatch { .. })));

        let err = assert_err!(session.disconnect(&s, &c, "operands"));
        assert!(matches!(
            err,
            SessionError::Graph(GraphError::NotFound(Missing::Link { .. }))
        ));
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn test_click_drag_and_remove() {
        let session = EditorSession::builtin(&manual());
        let a = assert_ok!(session.place_node(NodeKind::Number, Position::default()));

        assert_ok!(session.click(Some(&a)));
        assert_eq!(session.snapshot().selected(), Some(&a));

        assert_ok!(session.drag_node(&a, Position::new(40.0, 30.0)));
        assert_ok!(session.move_node(&a, -10.0, 0.0));
        assert_eq!(
            session.snapshot().node(&a).unwrap().position,
            Position::new(30.0, 30.0)
        );

        assert_ok!(session.remove_node(&a));
        let graph = session.snapshot();
        assert!(graph.is_empty());
        assert_eq!(graph.selected(), None);

        assert_err!(session.click(Some(&a)));
        assert_ok!(session.click(None));
    }

    #[test]
    fn test_click_keeps_generation_and_results() {
        let session = EditorSession::builtin(&SessionConfig::default());
        let a = number(&session, 1.0);
        let generation = session.generation();
        let before = session.results().unwrap();

        assert_ok!(session.click(Some(&a)));
        assert_ok!(session.click(None));
        assert_err!(session.click(Some(&NodeId::new("missing"))));

        assert_eq!(session.generation(), generation);
        assert!(Arc::ptr_eq(&before, &session.results().unwrap()));
    }

    #[test]
    fn test_failures_are_published_per_node() {
        let session = EditorSession::builtin(&SessionConfig::default());
        let a = number(&session, 1.0);
        let zero = number(&session, 0.0);
        let d = assert_ok!(session.place_node(NodeKind::Divide, Position::default()));
        assert_ok!(session.complete_connection(&a, &d, "dividend"));
        assert_ok!(session.complete_connection(&zero, &d, "divisor"));

        let results = session.results().unwrap();
        assert_eq!(
            results.error(&d),
            Some(&EvaluationError::failed("division by zero"))
        );
        assert_eq!(results.value(&a), Some(&Value::Number(1.0)));
        assert_eq!(session.value_of(&d), None);
    }

    #[tokio::test]
    async fn test_background_evaluation_publishes() {
        let session = EditorSession::builtin(&manual());
        let a = number(&session, 2.0);
        let s = assert_ok!(session.place_node(NodeKind::Sequence, Position::default()));
        assert_ok!(session.complete_connection(&a, &s, "items"));
        assert_ok!(session.complete_connection(&a, &s, "items"));

        let published = assert_ok!(session.evaluate_in_background().await);
        assert!(published);
        assert_eq!(
            session.value_of(&s),
            Some(Value::NumberSequence(vec![2.0, 2.0]))
        );
        assert_eq!(
            session.snapshot().node(&s).unwrap().output.value,
            Some(Value::NumberSequence(vec![2.0, 2.0]))
        );
    }

    #[tokio::test]
    async fn test_stale_background_evaluation_is_discarded() {
        let session = EditorSession::builtin(&manual());
        let a = number(&session, 2.0);
        session.evaluate_now();
        let before = session.results();

        let pending = session.start_background_evaluation();
        assert_ok!(session.edit_state(&a, {
            let mut patch = NodeState::new();
            patch.insert("value".to_string(), json!(9));
            patch
        }));

        let published = assert_ok!(session.finish_background_evaluation(pending).await);
        assert!(!published);
        assert_eq!(session.results(), before);
        assert_eq!(session.value_of(&a), Some(Value::Number(2.0)));
    }

    #[tokio::test]
    async fn test_click_does_not_stale_background_evaluation() {
        let session = EditorSession::builtin(&manual());
        let a = number(&session, 6.0);

        let pending = session.start_background_evaluation();
        assert_ok!(session.click(Some(&a)));

        let published = assert_ok!(session.finish_background_evaluation(pending).await);
        assert!(published);
        assert_eq!(session.value_of(&a), Some(Value::Number(6.0)));
        assert_eq!(session.snapshot().selected(), Some(&a));
    }

    #[tokio::test]
    async fn test_session_handle_is_shared_across_tasks() {
        let session = EditorSession::builtin(&SessionConfig::default());
        let worker = session.clone();
        let id = assert_ok!(
            tokio::spawn(async move { worker.place_node(NodeKind::String, Position::default()) })
                .await
                .unwrap()
        );
        assert_eq!(session.value_of(&id), Some(Value::from("")));
    }
}
