//! # Engine Configuration
//!
//! ```yaml
//! max_patch_iterations: 8
//! ledger_path: var/ledger.jsonl
//! rule_sets_dir: rulesets
//! ```
//!
//! Relative paths in a configuration file are resolved against the file's
//! directory.

use std::path::{Path, PathBuf};

use blueprint_patch::DEFAULT_MAX_ITERATIONS;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on patch rounds per attempt. Must be at least 1.
    pub max_patch_iterations: usize,
    /// JSON Lines ledger file. `None` keeps the ledger in memory.
    pub ledger_path: Option<PathBuf>,
    /// Directory of rule-set documents loaded at startup.
    pub rule_sets_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_patch_iterations: DEFAULT_MAX_ITERATIONS,
            ledger_path: None,
            rule_sets_dir: None,
        }
    }
}

impl EngineConfig {
    /// Parse YAML configuration text.
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| EngineError::Config {
            path: None,
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, EngineError> {
        let with_path = |reason: String| EngineError::Config {
            path: Some(path.to_path_buf()),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| with_path(e.to_string()))?;
        let mut config: Self = serde_yaml::from_str(&text).map_err(|e| with_path(e.to_string()))?;
        config.validate().map_err(|e| match e {
            EngineError::Config { reason, .. } => with_path(reason),
            other => other,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.ledger_path = config.ledger_path.map(|p| base.join(p));
        config.rule_sets_dir = config.rule_sets_dir.map(|p| base.join(p));
        tracing::debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_patch_iterations == 0 {
            return Err(EngineError::Config {
                path: None,
                reason: "max_patch_iterations must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_patch_iterations, 8);
        assert!(config.ledger_path.is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = EngineConfig::from_yaml_str("max_patch_iterations: 3\n").unwrap();
        assert_eq!(config.max_patch_iterations, 3);
        assert!(config.rule_sets_dir.is_none());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        assert!(matches!(
            EngineConfig::from_yaml_str("max_patch_iterations: 0\n"),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(EngineConfig::from_yaml_str("max_iterations: 3\n").is_err());
    }

    #[test]
    fn file_paths_resolve_against_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blueprint.yaml");
        std::fs::write(&path, "ledger_path: ledger.jsonl\nrule_sets_dir: rulesets\n").unwrap();
        let config = EngineConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.ledger_path, Some(dir.path().join("ledger.jsonl")));
        assert_eq!(config.rule_sets_dir, Some(dir.path().join("rulesets")));
    }
}
