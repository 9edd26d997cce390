//! Query timeouts for the PostgreSQL stores.

use std::{future::Future, time::Duration};
use tokio::time::timeout;

/// Timeout for single-document reads and writes
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for schema setup and full-table scans
pub const SCHEMA_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Elapsed(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Run a query, giving up after `duration`.
///
/// ```no_run
/// use blog_bracket::db::timeouts::{QUERY_TIMEOUT, with_timeout};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let rows = with_timeout(
///     QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM tournaments").fetch_all(pool),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Elapsed(duration)),
    }
}

/// [`with_timeout`] with [`QUERY_TIMEOUT`]
pub async fn with_query_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(QUERY_TIMEOUT, future).await
}
