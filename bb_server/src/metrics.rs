//! Prometheus metrics for the bracket server.
//!
//! Exported on `METRICS_BIND` when it is set. Without an installed exporter
//! every recording call is a no-op.

use async_trait::async_trait;
use blog_bracket::{StoreResult, UserId, WinRecorder};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::Arc};

/// Install the Prometheus exporter listening on `addr`
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

pub fn tournaments_created_total() {
    metrics::counter!("tournaments_created_total").increment(1);
}

/// Count a vote attempt by outcome (`recorded`, `closed`, `rejected`)
pub fn votes_total(outcome: &'static str) {
    metrics::counter!("votes_total", "outcome" => outcome).increment(1);
}

pub fn tournament_wins_total(success: bool) {
    metrics::counter!("tournament_wins_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Set the number of tournaments with a running actor
pub fn active_tournaments(count: usize) {
    metrics::gauge!("active_tournaments").set(count as f64);
}

pub fn sweep_changes_total(changed: usize) {
    metrics::counter!("sweep_changes_total").increment(changed as u64);
}

/// [`WinRecorder`] that counts deliveries before passing them on
pub struct MeteredWinRecorder {
    inner: Arc<dyn WinRecorder>,
}

impl MeteredWinRecorder {
    pub fn new(inner: Arc<dyn WinRecorder>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl WinRecorder for MeteredWinRecorder {
    async fn record_win(&self, user_id: UserId) -> StoreResult<()> {
        let result = self.inner.record_win(user_id).await;
        tournament_wins_total(result.is_ok());
        result
    }
}
