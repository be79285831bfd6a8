//! # blueprint-ledger — Audit Ledger
//!
//! An append-only log of [`ValidationAttempt`](blueprint_core::ValidationAttempt)s
//! with a cursor for undo/redo.
//!
//! - [`Ledger`]: verified appends, lookup by trace id, cursor movement,
//!   history snapshots and export. All mutation happens under one
//!   `parking_lot::Mutex`; reads clone `Arc`s out and iterate unlocked.
//! - [`LedgerStore`]: the persistence seam. [`MemoryStore`] keeps entries
//!   in process; [`JsonlStore`] writes one JSON entry per line and fsyncs
//!   every append.
//! - [`HistoryFilter`] / [`History`]: restartable, lazily filtered views.
//! - [`ExportRange`] / [`export`]: the audit JSON array.
//!
//! ## Invariants
//!
//! - Entries are never mutated or removed. Undo and redo only move the
//!   cursor. An append while the cursor is behind the tail starts a new
//!   branch whose parent is the cursor entry; the old forward entries stay
//!   stored but are no longer reachable through redo.
//! - An attempt whose stored trace id does not match its recomputed digest
//!   is rejected before it reaches the store.
//! - The store is written before the in-memory view is published, so a
//!   failed write leaves the ledger unchanged.
//!
//! ## Crate Policy
//!
//! - Depends only on `blueprint-core` internally.
//! - The cursor is not persisted. Reopening a store places it at the
//!   newest entry and rebuilds the timeline from `parent` links.

pub mod entry;
pub mod error;
pub mod export;
pub mod history;
pub mod ledger;
pub mod store;

pub use entry::LedgerEntry;
pub use error::LedgerError;
pub use export::{export, export_to_writer, ExportRange, ExportRecord, ExportViolation};
pub use history::{History, HistoryFilter};
pub use ledger::Ledger;
pub use store::{JsonlStore, LedgerStore, MemoryStore, StoreSwitch};
