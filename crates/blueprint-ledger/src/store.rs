//! # Ledger Stores
//!
//! The persistence seam under [`Ledger`](crate::Ledger). A store only ever
//! sees whole entries in sequence order: `append` is called once per entry
//! after the entry has been verified, and `load` returns what a previous
//! process appended.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::entry::LedgerEntry;
use crate::error::LedgerError;

/// Append-only persistence for ledger entries.
pub trait LedgerStore: Send + fmt::Debug {
    /// Every persisted entry, in sequence order.
    fn load(&mut self) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Durably persist one entry. On error nothing is persisted.
    fn append(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError>;

    /// Discard every persisted entry.
    fn reset(&mut self) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Shared on/off switch for a [`MemoryStore`], used to simulate outages.
#[derive(Debug, Clone)]
pub struct StoreSwitch(Arc<AtomicBool>);

impl StoreSwitch {
    /// Accept writes again.
    pub fn enable(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Reject writes with [`LedgerError::Unavailable`].
    pub fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether writes are accepted.
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Keeps entries in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Vec<LedgerEntry>,
    available: StoreSwitch,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty, available store.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            available: StoreSwitch(Arc::new(AtomicBool::new(true))),
        }
    }

    /// A handle that toggles this store's availability.
    pub fn switch(&self) -> StoreSwitch {
        self.available.clone()
    }

    /// Number of persisted entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is persisted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_available(&self) -> Result<(), LedgerError> {
        if self.available.is_enabled() {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("memory store is disabled".to_string()))
        }
    }
}

impl LedgerStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.ensure_available()?;
        Ok(self.entries.clone())
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        self.ensure_available()?;
        self.entries.push(entry.clone());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), LedgerError> {
        self.ensure_available()?;
        self.entries.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON Lines store
// ---------------------------------------------------------------------------

/// One JSON-encoded entry per line, fsynced on every append.
///
/// A write that fails part-way is rolled back by truncating the file to
/// its previous length. A torn final line left by a crash (no trailing
/// newline, not decodable) is dropped on load, and a decodable final line
/// missing its newline is terminated; any other undecodable or
/// inconsistent line is reported as [`LedgerError::Corrupt`].
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    file: File,
}

impl JsonlStore {
    /// Open (creating if absent) the ledger file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { path, file })
    }

    /// The ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, line: usize, reason: impl Into<String>) -> LedgerError {
        LedgerError::Corrupt {
            path: self.path.clone(),
            line,
            reason: reason.into(),
        }
    }
}

impl LedgerStore for JsonlStore {
    fn load(&mut self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&self.file);
        let mut entries = Vec::new();
        let mut offset: u64 = 0;
        let mut buf = String::new();
        let mut line_no = 0usize;
        let mut unterminated = false;

        loop {
            buf.clear();
            let read = reader.read_line(&mut buf)?;
            if read == 0 {
                break;
            }
            line_no += 1;
            let complete = buf.ends_with('\n');
            let text = buf.trim_end();
            if text.is_empty() {
                offset += read as u64;
                continue;
            }
            let entry: LedgerEntry = match serde_json::from_str(text) {
                Ok(entry) => entry,
                Err(e) if !complete => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = line_no,
                        error = %e,
                        "dropping torn final ledger line"
                    );
                    drop(reader);
                    self.file.set_len(offset)?;
                    self.file.sync_all()?;
                    return Ok(entries);
                }
                Err(e) => return Err(self.corrupt(line_no, e.to_string())),
            };
            if entry.sequence != entries.len() as u64 {
                return Err(self.corrupt(
                    line_no,
                    format!("expected sequence {}, found {}", entries.len(), entry.sequence),
                ));
            }
            if entry.parent.is_some_and(|p| p >= entry.sequence) {
                return Err(self.corrupt(line_no, "parent does not precede entry"));
            }
            if !entry.attempt.verify_integrity() {
                return Err(self.corrupt(
                    line_no,
                    format!("trace id {} does not match content", entry.attempt.trace_id),
                ));
            }
            entries.push(entry);
            offset += read as u64;
            unterminated = !complete;
        }
        drop(reader);

        if unterminated {
            tracing::warn!(path = %self.path.display(), line = line_no, "terminating final ledger line");
            self.file.seek(SeekFrom::End(0))?;
            self.file.write_all(b"\n")?;
            self.file.sync_data()?;
        }

        tracing::debug!(path = %self.path.display(), entries = entries.len(), "ledger file loaded");
        Ok(entries)
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let len_before = self.file.seek(SeekFrom::End(0))?;
        let written = self.file.write_all(&line).and_then(|()| self.file.sync_data());
        if let Err(e) = written {
            tracing::error!(
                path = %self.path.display(),
                sequence = entry.sequence,
                error = %e,
                "ledger append failed, rolling back"
            );
            if let Err(rollback) = self.file.set_len(len_before) {
                tracing::error!(path = %self.path.display(), error = %rollback, "ledger rollback failed");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), LedgerError> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;
        Ok(())
    }
}
