//! Reaction - Reactive node graph editor
//!
//! This crate provides the editor-facing layer over `reaction_runtime`:
//! - Layered session configuration (defaults, TOML, environment)
//! - The `EditorSession` handle a front end drives, with synchronous and
//!   background evaluation

// Re-export core crates
pub use reaction_runtime;
pub use reaction_types;

// Configuration
pub mod config;

// Editor session
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use session::{EditorSession, PendingEvaluation, SessionError};
