//! HTTP API for the bracket server.
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `GET /api/v1/tournaments?status=&page=&limit=` - List tournaments
//! - `GET /api/v1/tournaments/stats` - Counts per status
//! - `GET /api/v1/tournaments/{id}` - Tournament with its bracket
//!
//! ## Requires `Authorization: Bearer <jwt>`
//! - `POST /api/v1/tournaments` - Create (admin)
//! - `POST /api/v1/tournaments/{id}/register` - Register an owned entry
//! - `POST /api/v1/tournaments/{id}/withdraw` - Withdraw an entry
//! - `POST /api/v1/tournaments/{id}/start` - Start (admin)
//! - `POST /api/v1/tournaments/{id}/matches/{index}/vote` - Vote A or B
//! - `POST /api/v1/tournaments/{id}/matches/{index}/reset` - Clear votes (admin)
//! - `DELETE /api/v1/tournaments/{id}` - Delete (admin)
//!
//! Tokens are issued elsewhere; this server only verifies them.

pub mod middleware;
pub mod request_id;
pub mod tournaments;

use crate::config::TournamentDefaults;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use blog_bracket::{TournamentManager, db::Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    /// Secret used to verify bearer tokens
    pub jwt_secret: Arc<str>,
    pub defaults: TournamentDefaults,
    /// Present when running against PostgreSQL
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// ```rust,no_run
/// # use bb_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/stats", get(tournaments::tournament_stats))
        .route("/tournaments/{id}", get(tournaments::get_tournament));

    let protected_routes = Router::new()
        .route("/tournaments", post(tournaments::create_tournament))
        .route(
            "/tournaments/{id}",
            axum::routing::delete(tournaments::delete_tournament),
        )
        .route("/tournaments/{id}/register", post(tournaments::register_entry))
        .route("/tournaments/{id}/withdraw", post(tournaments::withdraw_entry))
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route(
            "/tournaments/{id}/matches/{index}/vote",
            post(tournaments::vote),
        )
        .route(
            "/tournaments/{id}/matches/{index}/reset",
            post(tournaments::reset_match_votes),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check for monitoring and load balancers.
///
/// `200 OK` when the database (if any) answers, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };
    let loaded = state.manager.tournament_count().await;

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": state.database.as_ref().map(|_| db_healthy),
        "tournaments": { "loaded": loaded },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
