//! Reaction
//!
//! Builds a small demo graph with the built-in node specs, evaluates it and
//! logs every node's result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use reaction_types::{NodeId, NodeKind, NodeState, Position};
use reaction::{EditorSession, SessionConfig};

/// Reactive node graph evaluator
#[derive(Parser, Debug)]
#[command(name = "reaction")]
#[command(about = "Reactive node graph evaluator", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate on a background worker
    #[arg(long)]
    background: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = SessionConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if args.background {
        config.evaluation.background = true;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reaction v{}", env!("CARGO_PKG_VERSION"));
    debug!(?config, "Configuration loaded");

    // Evaluation is driven explicitly below
    config.session.auto_evaluate = false;
    let session = EditorSession::builtin(&config);

    let a = place_number(&session, 3.0, Position::new(0.0, 0.0))?;
    let b = place_number(&session, 5.0, Position::new(0.0, 120.0))?;
    let c = session.place_node(NodeKind::Sum, Position::new(240.0, 60.0))?;
    session.complete_connection(&a, &c, "operands")?;
    session.complete_connection(&b, &c, "operands")?;

    if config.evaluation.background {
        info!("Evaluating on a background worker");
        if !session.evaluate_in_background().await? {
            warn!("Background evaluation was superseded; evaluating again");
            session.evaluate_now();
        }
    } else {
        session.evaluate_now();
    }

    let graph = session.snapshot();
    let Some(results) = session.results() else {
        anyhow::bail!("No evaluation was published");
    };

    for node in graph.nodes() {
        match results.result(&node.id) {
            Some(Ok(value)) => info!("{} = {}", node.name, value),
            Some(Err(e)) => warn!("{} failed: {}", node.name, e),
            None => warn!("{} was not evaluated", node.name),
        }
    }

    info!(
        "Evaluated {} nodes ({} failed)",
        results.len(),
        results.failed_count()
    );
    Ok(())
}

fn place_number(
    session: &EditorSession,
    value: f64,
    position: Position,
) -> Result<NodeId> {
    let id = session.place_node(NodeKind::Number, position)?;
    let mut patch = NodeState::new();
    patch.insert("value".to_string(), json!(value));
    session.edit_state(&id, patch)?;
    Ok(id)
}
