//! PostgreSQL access for tournament storage.
//!
//! A single pool backs all three stores: tournament documents, the `blogs`
//! table that entries are looked up in, and the `users.total_wins` counter
//! that champions are credited to. [`Database::open`] connects and makes sure
//! the tournament schema exists before any store touches it.

use crate::store::{PgEntryDirectory, PgTournamentStore, PgWinLedger, StoreResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use timeouts::{TimeoutResult, with_query_timeout};

pub mod config;
pub mod timeouts;

pub use config::DatabaseConfig;

/// Shared pool for the PostgreSQL stores
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect a pool sized by `config`
    ///
    /// Fails after `connection_timeout_secs` when no connection can be acquired.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Tournament database pool ready ({}..={} connections)",
            config.min_connections,
            config.max_connections
        );

        Ok(Self { pool })
    }

    /// Connect and create the tournament table, id sequence and index if missing
    ///
    /// ```no_run
    /// use blog_bracket::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::new("postgres://postgres@localhost/blog_bracket");
    ///     let db = Database::open(&config).await?;
    ///     let tournaments = db.tournament_store();
    ///     Ok(())
    /// }
    /// ```
    pub async fn open(config: &DatabaseConfig) -> StoreResult<Self> {
        let db = Self::new(config).await?;
        db.tournament_store().ensure_schema().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn tournament_store(&self) -> PgTournamentStore {
        PgTournamentStore::new(self.pool.clone())
    }

    /// Entry lookups against the `blogs` table
    pub fn entry_directory(&self) -> PgEntryDirectory {
        PgEntryDirectory::new(self.pool.clone())
    }

    /// Champion credits against `users.total_wins`
    pub fn win_ledger(&self) -> PgWinLedger {
        PgWinLedger::new(self.pool.clone())
    }

    /// Round trip to the server within the query timeout
    pub async fn health_check(&self) -> TimeoutResult<()> {
        with_query_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
