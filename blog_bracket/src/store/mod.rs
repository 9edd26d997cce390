//! Storage seams for the bracket engine.
//!
//! The engine needs three collaborators:
//! - [`TournamentStore`]: document store for tournament aggregates, by id
//! - [`EntryDirectory`]: entry existence and ownership lookup
//! - [`WinRecorder`]: sink for "user X won a tournament"
//!
//! Each has an in-memory implementation (tests, single-process deployments)
//! and a PostgreSQL implementation.

use crate::db::timeouts::TimeoutError;
use crate::tournament::{Entry, EntryId, Tournament, TournamentId, UserId};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryEntryDirectory, InMemoryTournamentStore, InMemoryWinLedger};
pub use postgres::{PgEntryDirectory, PgTournamentStore, PgWinLedger};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Timeout(#[from] TimeoutError),

    /// The stored document moved on since it was loaded
    #[error("Version conflict for tournament {id}: expected version {expected}")]
    VersionConflict { id: TournamentId, expected: i64 },

    #[error("Tournament {0} does not exist in the store")]
    Missing(TournamentId),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document store for tournament aggregates
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Reserve a fresh tournament id
    async fn allocate_id(&self) -> StoreResult<TournamentId>;

    /// Insert a newly created tournament
    async fn insert(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Load a tournament by id
    async fn load(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// All stored tournament ids
    async fn list_ids(&self) -> StoreResult<Vec<TournamentId>>;

    /// Replace a stored tournament.
    ///
    /// `tournament.version` must be exactly one more than the stored version;
    /// anything else is a [`StoreError::VersionConflict`].
    async fn save(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Remove a tournament. Returns `false` if it did not exist.
    async fn delete(&self, id: TournamentId) -> StoreResult<bool>;
}

/// Lookup of competable entries owned by users
#[async_trait]
pub trait EntryDirectory: Send + Sync {
    async fn find_entry(&self, id: EntryId) -> StoreResult<Option<Entry>>;
}

/// Receiver of tournament wins.
///
/// Delivery is at-least-once and not tied to the tournament's own persistence.
#[async_trait]
pub trait WinRecorder: Send + Sync {
    async fn record_win(&self, user_id: UserId) -> StoreResult<()>;
}
