//! # Ledger
//!
//! ```text
//! entries:   [0]──[1]──[2]──[3]          stored, never removed
//!                   \
//!                    └──[4]              appended after two undos
//! timeline:  [0]──[1]──[4]   cursor ─► 4
//! ```
//!
//! `entries` is the append-only log. `timeline` is the branch the cursor
//! moves along: undo and redo step through it, and an append truncates it
//! after the cursor before pushing the new entry.

use std::io::Write;
use std::sync::Arc;

use blueprint_core::{EntryId, TraceId, ValidationAttempt};
use parking_lot::Mutex;

use crate::entry::LedgerEntry;
use crate::error::LedgerError;
use crate::export::{export, export_to_writer, ExportRange};
use crate::history::{History, HistoryFilter};
use crate::store::{LedgerStore, MemoryStore};

#[derive(Debug)]
struct LedgerState {
    store: Box<dyn LedgerStore>,
    entries: Vec<Arc<LedgerEntry>>,
    /// Indices into `entries`, root first.
    timeline: Vec<usize>,
    /// Index into `timeline`. `None` only while the ledger is empty.
    cursor: Option<usize>,
}

impl LedgerState {
    fn cursor_entry(&self) -> Option<&Arc<LedgerEntry>> {
        self.cursor.map(|c| &self.entries[self.timeline[c]])
    }

    fn active_timeline(&self) -> Vec<Arc<LedgerEntry>> {
        match self.cursor {
            Some(c) => self.timeline[..=c]
                .iter()
                .map(|&i| Arc::clone(&self.entries[i]))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// The audit ledger.
#[derive(Debug)]
pub struct Ledger {
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// An empty ledger backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                store: Box::new(MemoryStore::new()),
                entries: Vec::new(),
                timeline: Vec::new(),
                cursor: None,
            }),
        }
    }

    /// Open a ledger over `store`, loading and verifying what it holds.
    ///
    /// The cursor is placed at the newest entry and the timeline is the
    /// chain of `parent` links leading to it.
    pub fn open(store: impl LedgerStore + 'static) -> Result<Self, LedgerError> {
        let mut store: Box<dyn LedgerStore> = Box::new(store);
        let loaded = store.load()?;

        let mut entries = Vec::with_capacity(loaded.len());
        for (index, entry) in loaded.into_iter().enumerate() {
            check_entry(&entry, index)?;
            entries.push(Arc::new(entry));
        }

        let mut timeline = Vec::new();
        let mut next = entries.len().checked_sub(1);
        while let Some(index) = next {
            timeline.push(index);
            next = entries[index].parent.map(|p| p as usize);
        }
        timeline.reverse();
        let cursor = timeline.len().checked_sub(1);

        tracing::info!(entries = entries.len(), timeline = timeline.len(), "ledger opened");
        Ok(Self {
            state: Mutex::new(LedgerState {
                store,
                entries,
                timeline,
                cursor,
            }),
        })
    }

    /// Verify, persist and publish an attempt. Returns its trace id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Integrity`] if the attempt's trace id does not match
    /// its content; any store error. In both cases nothing is appended.
    pub fn append(&self, attempt: ValidationAttempt) -> Result<TraceId, LedgerError> {
        let recomputed = attempt.recompute_trace_id()?;
        if recomputed != attempt.trace_id {
            return Err(LedgerError::Integrity {
                trace_id: attempt.trace_id,
                reason: format!("content hashes to {recomputed}"),
            });
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        let entry = LedgerEntry {
            sequence: state.entries.len() as u64,
            entry_id: EntryId::new(),
            parent: state.cursor_entry().map(|e| e.sequence),
            attempt,
        };
        state.store.append(&entry)?;

        let trace_id = entry.attempt.trace_id;
        let sequence = entry.sequence;
        let parent = entry.parent;
        let status = entry.attempt.status;
        let index = state.entries.len();
        state.entries.push(Arc::new(entry));

        let keep = state.cursor.map_or(0, |c| c + 1);
        let abandoned = state.timeline.len().saturating_sub(keep);
        state.timeline.truncate(keep);
        state.timeline.push(index);
        state.cursor = Some(state.timeline.len() - 1);

        tracing::info!(
            trace_id = %trace_id,
            sequence,
            parent = ?parent,
            status = %status,
            abandoned,
            "ledger entry appended"
        );
        Ok(trace_id)
    }

    /// The earliest entry with this trace id.
    pub fn get(&self, trace_id: &TraceId) -> Option<Arc<LedgerEntry>> {
        self.snapshot().into_iter().find(|e| e.trace_id() == trace_id)
    }

    /// The entry at a sequence number.
    pub fn get_sequence(&self, sequence: u64) -> Option<Arc<LedgerEntry>> {
        let state = self.state.lock();
        usize::try_from(sequence)
            .ok()
            .and_then(|i| state.entries.get(i))
            .cloned()
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<Arc<LedgerEntry>> {
        self.state.lock().cursor_entry().cloned()
    }

    /// Step the cursor back. `None` if already at the start of the timeline.
    pub fn undo(&self) -> Option<Arc<LedgerEntry>> {
        let mut state = self.state.lock();
        let c = state.cursor.filter(|&c| c > 0)?;
        state.cursor = Some(c - 1);
        let entry = state.cursor_entry().cloned();
        if let Some(e) = &entry {
            tracing::debug!(sequence = e.sequence, "ledger cursor moved back");
        }
        entry
    }

    /// Step the cursor forward. `None` if already at the timeline tail.
    pub fn redo(&self) -> Option<Arc<LedgerEntry>> {
        let mut state = self.state.lock();
        let c = state.cursor?;
        if c + 1 >= state.timeline.len() {
            return None;
        }
        state.cursor = Some(c + 1);
        let entry = state.cursor_entry().cloned();
        if let Some(e) = &entry {
            tracing::debug!(sequence = e.sequence, "ledger cursor moved forward");
        }
        entry
    }

    /// Number of stored entries, reachable or not.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Every stored entry, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<LedgerEntry>> {
        self.state.lock().entries.clone()
    }

    /// The current timeline up to and including the cursor.
    pub fn timeline(&self) -> Vec<Arc<LedgerEntry>> {
        self.state.lock().active_timeline()
    }

    /// A filtered snapshot.
    pub fn history(&self, filter: HistoryFilter) -> History {
        let entries = {
            let state = self.state.lock();
            if filter.timeline_only {
                state.active_timeline()
            } else {
                state.entries.clone()
            }
        };
        History::new(entries, filter)
    }

    /// Recompute every entry's trace id. Returns how many were checked.
    pub fn verify(&self) -> Result<usize, LedgerError> {
        let entries = self.snapshot();
        for entry in &entries {
            let recomputed = entry.attempt.recompute_trace_id()?;
            if recomputed != entry.attempt.trace_id {
                tracing::error!(sequence = entry.sequence, trace_id = %entry.attempt.trace_id, "ledger entry failed verification");
                return Err(LedgerError::Integrity {
                    trace_id: entry.attempt.trace_id,
                    reason: format!("entry {} content hashes to {recomputed}", entry.sequence),
                });
            }
        }
        Ok(entries.len())
    }

    /// Discard every entry, in the store and in memory.
    pub fn reset(&self) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        state.store.reset()?;
        let discarded = state.entries.len();
        state.entries.clear();
        state.timeline.clear();
        state.cursor = None;
        tracing::warn!(discarded, "ledger reset");
        Ok(())
    }

    /// Render a range as the audit JSON array.
    pub fn export(&self, range: ExportRange) -> Result<Vec<u8>, LedgerError> {
        let selected = self.select(range);
        export(selected.iter().map(Arc::as_ref))
    }

    /// Write a range as the audit JSON array.
    pub fn export_to_writer<W: Write>(&self, range: ExportRange, writer: W) -> Result<(), LedgerError> {
        let selected = self.select(range);
        export_to_writer(selected.iter().map(Arc::as_ref), writer)
    }

    fn select(&self, range: ExportRange) -> Vec<Arc<LedgerEntry>> {
        let entries = match range {
            ExportRange::Timeline => self.timeline(),
            _ => self.snapshot(),
        };
        entries.into_iter().filter(|e| range.contains(e)).collect()
    }
}

fn check_entry(entry: &LedgerEntry, index: usize) -> Result<(), LedgerError> {
    let integrity = |reason: String| LedgerError::Integrity {
        trace_id: entry.attempt.trace_id,
        reason,
    };
    if entry.sequence != index as u64 {
        return Err(integrity(format!("expected sequence {index}, found {}", entry.sequence)));
    }
    if entry.parent.is_some_and(|p| p >= entry.sequence) {
        return Err(integrity(format!("entry {index} names a later parent")));
    }
    let recomputed = entry.attempt.recompute_trace_id()?;
    if recomputed != entry.attempt.trace_id {
        return Err(integrity(format!("entry {index} content hashes to {recomputed}")));
    }
    Ok(())
}
