//! Engine construction from global options.

use std::path::PathBuf;

use anyhow::{Context, Result};
use blueprint_engine::{Engine, EngineConfig};
use blueprint_rules::RuleSet;

use crate::BUILTIN_RULE_SETS;

/// Ledger file used when neither `--ledger` nor the configuration names one.
pub const DEFAULT_LEDGER_PATH: &str = ".blueprint/ledger.jsonl";

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// YAML engine configuration.
    pub config: Option<PathBuf>,
    /// Ledger file, overriding the configuration.
    pub ledger: Option<PathBuf>,
    /// Rule-set directory, overriding the configuration.
    pub rules_dir: Option<PathBuf>,
}

/// Resolve the effective configuration: file (if any), then flags.
pub fn resolve_config(opts: &GlobalOptions) -> Result<EngineConfig> {
    let mut config = match &opts.config {
        Some(path) => EngineConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(ledger) = &opts.ledger {
        config.ledger_path = Some(ledger.clone());
    }
    if config.ledger_path.is_none() {
        config.ledger_path = Some(PathBuf::from(DEFAULT_LEDGER_PATH));
    }
    if let Some(dir) = &opts.rules_dir {
        config.rule_sets_dir = Some(dir.clone());
    }
    Ok(config)
}

/// Build the engine: configured ledger and rule sets, then any bundled
/// rule set whose version is not already registered.
pub fn build_engine(opts: &GlobalOptions) -> Result<Engine> {
    let config = resolve_config(opts)?;
    tracing::debug!(?config, "effective configuration");
    let mut engine = Engine::from_config(config).context("failed to initialize engine")?;
    register_builtins(&mut engine)?;
    Ok(engine)
}

/// Register every bundled rule set not already present.
pub fn register_builtins(engine: &mut Engine) -> Result<()> {
    for (name, text) in BUILTIN_RULE_SETS {
        let rule_set = RuleSet::from_yaml_str(text)
            .with_context(|| format!("bundled rule set {name} is invalid"))?;
        if engine.versions().any(|v| v == rule_set.version()) {
            tracing::debug!(version = %rule_set.version(), "bundled rule set shadowed by rules directory");
            continue;
        }
        engine
            .register_rule_set(rule_set)
            .with_context(|| format!("failed to register bundled rule set {name}"))?;
    }
    Ok(())
}
