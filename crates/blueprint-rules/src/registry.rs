//! # Rule-Set Registry
//!
//! Versions are registered once and never redefined. Rule sets are handed
//! out behind `Arc`, so evaluators share them read-only across threads.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use blueprint_core::RuleSetVersion;

use crate::error::RuleSetError;
use crate::ruleset::RuleSet;

/// Registered rule sets, keyed by version.
#[derive(Debug, Clone, Default)]
pub struct RuleSetRegistry {
    sets: BTreeMap<RuleSetVersion, Arc<RuleSet>>,
}

impl RuleSetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule set. Fails if the version is already present.
    pub fn insert(&mut self, rule_set: RuleSet) -> Result<Arc<RuleSet>, RuleSetError> {
        self.insert_shared(Arc::new(rule_set))
    }

    /// Register an already shared rule set.
    pub fn insert_shared(&mut self, rule_set: Arc<RuleSet>) -> Result<Arc<RuleSet>, RuleSetError> {
        let version = rule_set.version().clone();
        if self.sets.contains_key(&version) {
            return Err(RuleSetError::DuplicateVersion(version));
        }
        self.sets.insert(version, Arc::clone(&rule_set));
        Ok(rule_set)
    }

    /// Look up a version.
    pub fn get(&self, version: &RuleSetVersion) -> Option<Arc<RuleSet>> {
        self.sets.get(version).cloned()
    }

    /// Whether a version is registered.
    pub fn contains(&self, version: &RuleSetVersion) -> bool {
        self.sets.contains_key(version)
    }

    /// Every registered rule set, in version order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RuleSet>> {
        self.sets.values()
    }

    /// Registered versions in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &RuleSetVersion> {
        self.sets.keys()
    }

    /// Number of registered versions.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Load every `*.yaml`, `*.yml` and `*.json` file in `dir`, in file-name
    /// order. Returns the versions loaded. The first failing file aborts
    /// the load; versions registered before it remain registered.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<RuleSetVersion>, RuleSetError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_document = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "yaml" | "yml" | "json"));
            if path.is_file() && is_document {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let rule_set = RuleSet::load_file(&path)?;
            let version = rule_set.version().clone();
            self.insert(rule_set)?;
            tracing::info!(version = %version, path = %path.display(), "registered rule set");
            loaded.push(version);
        }
        Ok(loaded)
    }
}
