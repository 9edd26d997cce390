//! PostgreSQL storage implementations.
//!
//! Tournaments are stored as one JSONB document per row next to a `version`
//! column used for optimistic concurrency. Entries are read from the `blogs`
//! table and wins are counted on `users.total_wins`.

use super::{EntryDirectory, StoreError, StoreResult, TournamentStore, WinRecorder};
use crate::db::timeouts::{SCHEMA_TIMEOUT, with_query_timeout, with_timeout};
use crate::tournament::{Entry, EntryId, Tournament, TournamentId, UserId};
use async_trait::async_trait;
use sqlx::{PgPool, Row, types::Json};

const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS tournament_ids;
CREATE TABLE IF NOT EXISTS tournaments (
    id BIGINT PRIMARY KEY,
    version BIGINT NOT NULL,
    status TEXT NOT NULL,
    document JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS tournaments_status_idx ON tournaments (status);
";

/// Tournament documents in the `tournaments` table
pub struct PgTournamentStore {
    pool: PgPool,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the sequence, table and index if they are missing
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        with_timeout(SCHEMA_TIMEOUT, sqlx::raw_sql(SCHEMA).execute(&self.pool)).await?;
        Ok(())
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn allocate_id(&self) -> StoreResult<TournamentId> {
        let row = with_query_timeout(
            sqlx::query("SELECT nextval('tournament_ids') AS id").fetch_one(&self.pool),
        )
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        with_query_timeout(
            sqlx::query(
                "INSERT INTO tournaments (id, version, status, document, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(tournament.id)
            .bind(tournament.version)
            .bind(tournament.status.to_string())
            .bind(Json(tournament))
            .bind(tournament.created_at)
            .bind(tournament.updated_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn load(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = with_query_timeout(
            sqlx::query("SELECT document FROM tournaments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(r) => {
                let Json(tournament): Json<Tournament> = r.try_get("document")?;
                Ok(Some(tournament))
            }
            None => Ok(None),
        }
    }

    async fn list_ids(&self) -> StoreResult<Vec<TournamentId>> {
        let rows = with_timeout(
            SCHEMA_TIMEOUT,
            sqlx::query("SELECT id FROM tournaments ORDER BY id").fetch_all(&self.pool),
        )
        .await?;

        rows.iter()
            .map(|r| r.try_get("id").map_err(StoreError::from))
            .collect()
    }

    async fn save(&self, tournament: &Tournament) -> StoreResult<()> {
        let result = with_query_timeout(
            sqlx::query(
                "UPDATE tournaments
                 SET version = $2, status = $3, document = $4, updated_at = $5
                 WHERE id = $1 AND version = $2 - 1",
            )
            .bind(tournament.id)
            .bind(tournament.version)
            .bind(tournament.status.to_string())
            .bind(Json(tournament))
            .bind(tournament.updated_at)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists = with_query_timeout(
            sqlx::query("SELECT version FROM tournaments WHERE id = $1")
                .bind(tournament.id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match exists {
            Some(r) => {
                let stored: i64 = r.try_get("version")?;
                Err(StoreError::VersionConflict {
                    id: tournament.id,
                    expected: stored + 1,
                })
            }
            None => Err(StoreError::Missing(tournament.id)),
        }
    }

    async fn delete(&self, id: TournamentId) -> StoreResult<bool> {
        let result = with_query_timeout(
            sqlx::query("DELETE FROM tournaments WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Entries backed by the `blogs` table
pub struct PgEntryDirectory {
    pool: PgPool,
}

impl PgEntryDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryDirectory for PgEntryDirectory {
    async fn find_entry(&self, id: EntryId) -> StoreResult<Option<Entry>> {
        let row = with_query_timeout(
            sqlx::query("SELECT id, author_id FROM blogs WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(r) => Ok(Some(Entry {
                id: r.try_get("id")?,
                owner_id: r.try_get("author_id")?,
            })),
            None => Ok(None),
        }
    }
}

/// Win counter on `users.total_wins`
pub struct PgWinLedger {
    pool: PgPool,
}

impl PgWinLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WinRecorder for PgWinLedger {
    async fn record_win(&self, user_id: UserId) -> StoreResult<()> {
        let result = with_query_timeout(
            sqlx::query("UPDATE users SET total_wins = total_wins + 1 WHERE id = $1")
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            log::warn!("Win recorded for unknown user {}", user_id);
        }
        Ok(())
    }
}
