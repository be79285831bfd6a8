//! # Engine
//!
//! The engine owns the rule-set registry, the fix registry and the ledger.
//! Validation itself is pure; only [`Engine::validate_and_patch`],
//! [`Engine::validate_json`] and [`Engine::replay`] touch the ledger, and
//! each appends exactly one entry.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use blueprint_compliance::SemanticValidator;
use blueprint_core::{BlueprintError, Record, RuleSetVersion, TraceId, ValidationAttempt, Violation};
use blueprint_ledger::{ExportRange, History, HistoryFilter, JsonlStore, Ledger, LedgerEntry};
use blueprint_patch::{DeterministicPatcher, FixFunction, FixRegistry};
use blueprint_rules::{RuleSet, RuleSetError, RuleSetRegistry};
use blueprint_schema::{RecordValidator, SchemaValidator};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// The validation-patch-ledger engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    rule_sets: RuleSetRegistry,
    fixes: Arc<FixRegistry>,
    patcher: DeterministicPatcher,
    schema: SchemaValidator,
    semantic: SemanticValidator,
    ledger: Ledger,
}

impl Engine {
    /// An engine with default configuration, built-in fixes, no rule sets
    /// and an in-memory ledger.
    pub fn in_memory() -> Self {
        Self::with_ledger(EngineConfig::default(), Ledger::in_memory())
    }

    /// An engine over an existing ledger. `config.ledger_path` and
    /// `config.rule_sets_dir` are not consulted.
    pub fn with_ledger(config: EngineConfig, ledger: Ledger) -> Self {
        let fixes = Arc::new(FixRegistry::builtin());
        let patcher = DeterministicPatcher::new(Arc::clone(&fixes), config.max_patch_iterations);
        Self {
            config,
            rule_sets: RuleSetRegistry::new(),
            fixes,
            patcher,
            schema: SchemaValidator::new(),
            semantic: SemanticValidator::new(),
            ledger,
        }
    }

    /// Build an engine from configuration: open the ledger file if one is
    /// configured and load the rule-set directory if one is configured.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let ledger = match &config.ledger_path {
            Some(path) => Ledger::open(JsonlStore::open(path)?)?,
            None => Ledger::in_memory(),
        };
        let rule_sets_dir = config.rule_sets_dir.clone();
        let mut engine = Self::with_ledger(config, ledger);
        if let Some(dir) = rule_sets_dir {
            engine.load_rule_sets(&dir)?;
        }
        Ok(engine)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a custom fix function. Registering over an existing name
    /// replaces it.
    pub fn register_fix(&mut self, name: impl Into<String>, fix: impl FixFunction + 'static) {
        Arc::make_mut(&mut self.fixes).register(name, fix);
        self.patcher = DeterministicPatcher::new(Arc::clone(&self.fixes), self.config.max_patch_iterations);
    }

    /// Register a rule set after checking that every fix it names exists.
    pub fn register_rule_set(&mut self, rule_set: RuleSet) -> Result<Arc<RuleSet>, EngineError> {
        self.check_fixes(&rule_set)?;
        let shared = self.rule_sets.insert(rule_set)?;
        tracing::info!(version = %shared.version(), "rule set registered");
        Ok(shared)
    }

    /// Load every rule-set document in `dir`. Nothing is registered unless
    /// every document loads and references only registered fixes.
    pub fn load_rule_sets(&mut self, dir: &Path) -> Result<Vec<RuleSetVersion>, EngineError> {
        let mut staged = RuleSetRegistry::new();
        let versions = staged.load_dir(dir)?;
        for rule_set in staged.iter() {
            self.check_fixes(rule_set)?;
            if self.rule_sets.contains(rule_set.version()) {
                return Err(RuleSetError::DuplicateVersion(rule_set.version().clone()).into());
            }
        }
        for rule_set in staged.iter() {
            self.rule_sets.insert_shared(Arc::clone(rule_set))?;
        }
        tracing::info!(dir = %dir.display(), count = versions.len(), "rule sets loaded");
        Ok(versions)
    }

    fn check_fixes(&self, rule_set: &RuleSet) -> Result<(), EngineError> {
        match rule_set.fix_names().into_iter().find(|name| !self.fixes.contains(name)) {
            Some(missing) => Err(EngineError::UnknownFix {
                version: rule_set.version().clone(),
                fix: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Look up a registered rule set.
    pub fn rule_set(&self, version: &RuleSetVersion) -> Result<Arc<RuleSet>, EngineError> {
        self.rule_sets
            .get(version)
            .ok_or_else(|| EngineError::UnknownRuleSetVersion(version.clone()))
    }

    /// Registered versions in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &RuleSetVersion> {
        self.rule_sets.versions()
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Run the pipeline without touching the ledger.
    pub fn evaluate(&self, record: Record, version: &RuleSetVersion) -> Result<ValidationAttempt, EngineError> {
        let rules = self.rule_set(version)?;
        if let Some((field, _)) = record.iter().find(|(_, value)| !value.is_canonicalizable()) {
            return Err(BlueprintError::MalformedRecord(format!(
                "field '{field}' holds a non-finite number or an integer beyond ±(2^53-1)"
            ))
            .into());
        }

        let structural = self.schema.validate(&record, &rules);
        let patched = self.patcher.patch(&record, &structural, &rules);

        let mut violations = patched.unfixed;
        if !violations.iter().any(Violation::is_failure) {
            violations.extend(self.semantic.validate(&patched.record, &rules));
        }

        let attempt = ValidationAttempt::new(
            record,
            patched.record,
            version.clone(),
            violations,
            patched.fixed,
            patched.outcome,
            patched.iterations,
        )?;
        tracing::debug!(
            trace_id = %attempt.trace_id,
            rule_set = %version,
            status = %attempt.status,
            patch_outcome = %attempt.patch_outcome,
            iterations = attempt.iteration_count,
            "record evaluated"
        );
        Ok(attempt)
    }

    /// Validate, patch and record an attempt.
    pub fn validate_and_patch(&self, record: Record, version: &RuleSetVersion) -> Result<ValidationAttempt, EngineError> {
        let attempt = self.evaluate(record, version)?;
        self.ledger.append(attempt.clone())?;
        tracing::info!(
            trace_id = %attempt.trace_id,
            rule_set = %version,
            status = %attempt.status,
            violations = attempt.violations.len(),
            fixed = attempt.fixed.len(),
            "validation recorded"
        );
        Ok(attempt)
    }

    /// Parse a JSON object and validate it. Malformed text is returned as
    /// an error and never appended.
    pub fn validate_json(&self, text: &str, version: &RuleSetVersion) -> Result<ValidationAttempt, EngineError> {
        let record = Record::parse_json(text)?;
        self.validate_and_patch(record, version)
    }

    /// Re-run a recorded input under `version` and record the result as a
    /// replay. `None` if no entry has this trace id.
    pub fn replay(&self, trace_id: &TraceId, version: &RuleSetVersion) -> Result<Option<ValidationAttempt>, EngineError> {
        let Some(original) = self.ledger.get(trace_id) else {
            return Ok(None);
        };
        let attempt = self
            .evaluate(original.attempt.input_record.clone(), version)?
            .with_replay_of(*trace_id);
        self.ledger.append(attempt.clone())?;
        tracing::info!(
            original = %trace_id,
            trace_id = %attempt.trace_id,
            from = %original.attempt.rule_set_version,
            to = %version,
            status = %attempt.status,
            "replay recorded"
        );
        Ok(Some(attempt))
    }

    // -----------------------------------------------------------------------
    // Ledger access
    // -----------------------------------------------------------------------

    /// A filtered snapshot of the ledger.
    pub fn history(&self, filter: HistoryFilter) -> History {
        self.ledger.history(filter)
    }

    /// Step the ledger cursor back.
    pub fn undo(&self) -> Option<Arc<LedgerEntry>> {
        self.ledger.undo()
    }

    /// Step the ledger cursor forward.
    pub fn redo(&self) -> Option<Arc<LedgerEntry>> {
        self.ledger.redo()
    }

    /// The earliest attempt with this trace id.
    pub fn get(&self, trace_id: &TraceId) -> Option<Arc<LedgerEntry>> {
        self.ledger.get(trace_id)
    }

    /// Render a ledger range as the audit JSON array.
    pub fn export_ledger(&self, range: ExportRange) -> Result<Vec<u8>, EngineError> {
        Ok(self.ledger.export(range)?)
    }

    /// Write a ledger range as the audit JSON array.
    pub fn export_ledger_to<W: Write>(&self, range: ExportRange, writer: W) -> Result<(), EngineError> {
        Ok(self.ledger.export_to_writer(range, writer)?)
    }

    /// Recompute every stored trace id.
    pub fn verify_ledger(&self) -> Result<usize, EngineError> {
        Ok(self.ledger.verify()?)
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The fix registry in use.
    pub fn fixes(&self) -> &FixRegistry {
        &self.fixes
    }
}
