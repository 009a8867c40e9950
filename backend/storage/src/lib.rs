//! `chanlogs-storage`: persistence for canonical events.
//!
//! Provides:
//! - Per-key write serialization ([`WriteCoordinator`])
//! - Append-only file logs ([`FileBackend`])
//! - SQLite row storage ([`DatabaseBackend`])
//! - Backend selection ([`BackendRouter`])
//! - Durable per-channel toggles ([`SqliteToggleStore`])
//! - The full record pipeline ([`ChanLogger`])

pub mod coordinator;
pub mod database;
pub mod file;
pub mod recorder;
pub mod router;
pub mod toggles;

pub use coordinator::WriteCoordinator;
pub use database::DatabaseBackend;
pub use file::FileBackend;
pub use recorder::{ChanLogger, RecordSummary};
pub use router::BackendRouter;
pub use toggles::SqliteToggleStore;

/// What happened to one canonical event handed to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The backend was unreachable; the event was logged and abandoned.
    Dropped,
}
