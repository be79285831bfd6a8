//! # History Views
//!
//! A [`History`] is a snapshot of the ledger taken under the lock and then
//! read without it. Iterating it twice yields the same entries; appends
//! made after the snapshot are not visible.

use std::sync::Arc;

use blueprint_core::{AttemptStatus, RuleSetVersion};

use crate::entry::LedgerEntry;

/// Which entries a [`History`] yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Only attempts with this status.
    pub status: Option<AttemptStatus>,
    /// Only attempts evaluated against this version.
    pub rule_set_version: Option<RuleSetVersion>,
    /// Only entries on the current timeline, up to the cursor.
    pub timeline_only: bool,
    /// Keep only the newest this-many matching entries.
    pub limit: Option<usize>,
}

impl HistoryFilter {
    /// Every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a status.
    pub fn with_status(mut self, status: AttemptStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to a rule set version.
    pub fn with_rule_set_version(mut self, version: RuleSetVersion) -> Self {
        self.rule_set_version = Some(version);
        self
    }

    /// Restrict to the current timeline.
    pub fn timeline(mut self) -> Self {
        self.timeline_only = true;
        self
    }

    /// Keep only the newest `limit` matching entries.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &LedgerEntry) -> bool {
        self.status.map_or(true, |s| entry.attempt.status == s)
            && self
                .rule_set_version
                .as_ref()
                .map_or(true, |v| &entry.attempt.rule_set_version == v)
    }
}

/// A finite, restartable, lazily filtered view of ledger entries.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Arc<LedgerEntry>>,
    filter: HistoryFilter,
}

impl History {
    pub(crate) fn new(entries: Vec<Arc<LedgerEntry>>, filter: HistoryFilter) -> Self {
        Self { entries, filter }
    }

    /// Iterate the matching entries, oldest first. With a limit, the
    /// oldest matches are skipped so the newest `limit` remain.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<LedgerEntry>> + '_ {
        let skip = self
            .filter
            .limit
            .map_or(0, |limit| self.matching().count().saturating_sub(limit));
        self.matching().skip(skip)
    }

    fn matching(&self) -> impl Iterator<Item = &Arc<LedgerEntry>> + '_ {
        self.entries.iter().filter(move |e| self.filter.matches(e))
    }

    /// Number of matching entries.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Whether no entry matches.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// The filter this view applies.
    pub fn filter(&self) -> &HistoryFilter {
        &self.filter
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Arc<LedgerEntry>;
    type IntoIter = Box<dyn Iterator<Item = &'a Arc<LedgerEntry>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
