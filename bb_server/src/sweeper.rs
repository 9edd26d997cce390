//! Background sweep of running tournaments.
//!
//! Elapsed matches are also settled on every read; the sweep makes sure
//! completions and win counts happen even when nobody is looking.

use crate::metrics;
use blog_bracket::TournamentManager;
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};

/// Run `sweep_all` every `period` until `shutdown` flips to `true`
pub async fn run(
    manager: Arc<TournamentManager>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(period_secs = period.as_secs(), "Sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let changed = manager.sweep_all(Utc::now()).await;
                metrics::sweep_changes_total(changed);
                metrics::active_tournaments(manager.tournament_count().await);
                if changed > 0 {
                    tracing::debug!(changed, "Sweep settled tournaments");
                }
            }
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Sweeper stopped");
}
