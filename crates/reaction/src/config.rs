//! Session Configuration
//!
//! Layered configuration for the editor session and the binary:
//! built-in defaults, then an optional TOML file, then `REACTION_*`
//! environment variables (`__` separates nested keys, e.g.
//! `REACTION_SESSION__AUTO_EVALUATE=false`).

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "REACTION_";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Extract(#[from] figment::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Top-level configuration (reaction.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Editing behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Re-evaluate after every successful mutation
    #[serde(default = "default_true")]
    pub auto_evaluate: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_evaluate: true,
        }
    }
}

/// Evaluation scheduling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// Run passes on a blocking worker instead of the caller's thread
    #[serde(default)]
    pub background: bool,
}

/// Log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_filter() -> String {
    "reaction=info".to_string()
}

impl SessionConfig {
    /// Provider chain: defaults, optional TOML file, environment
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(SessionConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the layered configuration. A path that was given must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }
        Ok(Self::figment(path).extract()?)
    }

    /// Parse a TOML document on its own, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(config.session.auto_evaluate);
        assert!(!config.evaluation.background);
        assert_eq!(config.logging.filter, "reaction=info");
    }

    #[test]
    fn test_from_toml_str_partial() {
        let config = SessionConfig::from_toml_str(
            r#"
            [evaluation]
            background = true
            "#,
        )
        .unwrap();
        assert!(config.evaluation.background);
        assert!(config.session.auto_evaluate);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = SessionConfig::from_toml_str("[session]\nauto_evaluate = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[session]\nauto_evaluate = false\n\n[logging]\nfilter = \"reaction=trace\"").unwrap();

        let config = SessionConfig::load(Some(file.path())).unwrap();
        assert!(!config.session.auto_evaluate);
        assert_eq!(config.logging.filter, "reaction=trace");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = SessionConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }
}
