//! Integration tests for the HTTP API.
//!
//! Runs the full router against in-memory stores with locally minted tokens.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bb_server::api::{AppState, create_router, middleware::Claims};
use bb_server::config::TournamentDefaults;
use blog_bracket::{
    Entry, TournamentManager,
    store::{InMemoryEntryDirectory, InMemoryTournamentStore, InMemoryWinLedger},
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "test_secret_key_for_testing_only_32b";
const ADMIN: i64 = 99;

/// Router with entries 101..=104 owned by users 1..=4
async fn create_test_server() -> axum::Router {
    let entries = Arc::new(InMemoryEntryDirectory::new());
    for user in 1..=4 {
        entries
            .insert(Entry {
                id: 100 + user,
                owner_id: user,
            })
            .await;
    }
    let manager = Arc::new(TournamentManager::new(
        Arc::new(InMemoryTournamentStore::new()),
        entries,
        Arc::new(InMemoryWinLedger::new()),
    ));

    create_router(AppState {
        manager,
        jwt_secret: Arc::from(SECRET),
        defaults: TournamentDefaults::default(),
        database: None,
    })
}

fn token(user_id: i64, admin: bool) -> String {
    let claims = Claims {
        sub: user_id,
        admin,
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    bearer: Option<String>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let request = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_full_tournament(app: &axum::Router) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tournaments",
        Some(token(ADMIN, true)),
        Some(json!({ "name": "Spring Cup", "size": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    for user in 1..=4 {
        let (status, _) = send(
            app,
            "POST",
            &format!("/api/v1/tournaments/{id}/register"),
            Some(token(user, false)),
            Some(json!({ "entry_id": 100 + user })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    id
}

// ============================================================================
// Health and Listing
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], Value::Null);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_list_starts_empty() {
    let app = create_test_server().await;

    let (status, body) = send(&app, "GET", "/api/v1/tournaments", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["tournaments"], json!([]));

    let (status, body) = send(&app, "GET", "/api/v1/tournaments/stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

// ============================================================================
// Authentication and Authorization
// ============================================================================

#[tokio::test]
async fn test_create_requires_token() {
    let app = create_test_server().await;
    let payload = json!({ "name": "Cup", "size": 4 });

    let (status, _) = send(&app, "POST", "/api/v1/tournaments", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some("not.a.token".to_string()),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_requires_admin() {
    let app = create_test_server().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(token(1, false)),
        Some(json!({ "name": "Cup", "size": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("Forbidden"));
}

#[tokio::test]
async fn test_create_as_admin() {
    let app = create_test_server().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(token(ADMIN, true)),
        Some(json!({ "name": "Cup", "size": 8, "match_duration_mins": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "draft");
    assert_eq!(body["total_rounds"], 3);
    assert_eq!(body["creator_id"], ADMIN);

    let id = body["id"].as_i64().unwrap();
    let (status, body) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["name"], "Cup");
}

#[tokio::test]
async fn test_create_rejects_bad_size() {
    let app = create_test_server().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(token(ADMIN, true)),
        Some(json!({ "name": "Cup", "size": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("capacity"));
}

#[tokio::test]
async fn test_create_rejects_oversized_duration() {
    let app = create_test_server().await;

    // Past the one-year cap, and past what a time span can hold at all
    for minutes in [200_000_000_000_i64, i64::MAX] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/tournaments",
            Some(token(ADMIN, true)),
            Some(json!({ "name": "Cup", "size": 4, "match_duration_mins": minutes })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{minutes}");
        assert!(body["error"].as_str().unwrap().contains("duration"));
    }

    let (_, body) = send(&app, "GET", "/api/v1/tournaments/stats", None, None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_list_far_past_last_page() {
    let app = create_test_server().await;
    create_full_tournament(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/tournaments?page={}&limit=100", u64::MAX),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournaments"], json!([]));
    assert_eq!(body["total"], 1);
    assert_eq!(body["has_prev"], true);
    assert_eq!(body["has_next"], false);
}

// ============================================================================
// Bracket Flow
// ============================================================================

#[tokio::test]
async fn test_register_start_and_vote() {
    let app = create_test_server().await;
    let id = create_full_tournament(&app).await;

    // Only administrators start tournaments
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/start"),
        Some(token(1, false)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/start"),
        Some(token(ADMIN, true)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["matches"].as_array().unwrap().len(), 2);
    assert_eq!(body["live_match"], 0);

    let vote_uri = format!("/api/v1/tournaments/{id}/matches/0/vote");
    let (status, body) = send(
        &app,
        "POST",
        &vote_uri,
        Some(token(50, false)),
        Some(json!({ "pick": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes_a"], 1);
    assert_eq!(body["votes_b"], 0);

    let (status, body) = send(
        &app,
        "POST",
        &vote_uri,
        Some(token(50, false)),
        Some(json!({ "pick": "B" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already voted"));

    // Match 1 opens only after match 0 closes
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/1/vote"),
        Some(token(50, false)),
        Some(json!({ "pick": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vote_keeps_match_live() {
    let app = create_test_server().await;
    let id = create_full_tournament(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/start"),
        Some(token(ADMIN, true)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["live_match"], 0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/0/vote"),
        Some(token(60, false)),
        Some(json!({ "pick": "B" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes_b"], 1);
    assert_eq!(body["winner"], Value::Null);

    let (_, body) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(body["status"], "active");
    assert_eq!(body["current_round"], 1);
    assert_eq!(body["live_match"], 0);
    assert_eq!(body["matches"][0]["voters"], json!([60]));
}

#[tokio::test]
async fn test_invalid_pick_is_rejected() {
    let app = create_test_server().await;
    let id = create_full_tournament(&app).await;
    send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/start"),
        Some(token(ADMIN, true)),
        None,
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/matches/0/vote"),
        Some(token(50, false)),
        Some(json!({ "pick": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid pick"));
}

#[tokio::test]
async fn test_register_foreign_entry_is_forbidden() {
    let app = create_test_server().await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/tournaments",
        Some(token(ADMIN, true)),
        Some(json!({ "name": "Cup", "size": 4 })),
    )
    .await;
    let id = body["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/register"),
        Some(token(2, false)),
        Some(json!({ "entry_id": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/register"),
        Some(token(2, false)),
        Some(json!({ "entry_id": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_withdraw_entry() {
    let app = create_test_server().await;
    let id = create_full_tournament(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{id}/withdraw"),
        Some(token(3, false)),
        Some(json!({ "entry_id": 103 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry_id"], 103);

    let (_, body) = send(&app, "GET", &format!("/api/v1/tournaments/{id}"), None, None).await;
    assert_eq!(body["entries"].as_array().unwrap().len(), 3);
}

// ============================================================================
// Missing and Deleted Tournaments
// ============================================================================

#[tokio::test]
async fn test_missing_tournament_is_404() {
    let app = create_test_server().await;

    let (status, body) = send(&app, "GET", "/api/v1/tournaments/4242", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tournament 4242 not found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/tournaments/4242/matches/0/vote",
        Some(token(1, false)),
        Some(json!({ "pick": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_tournament() {
    let app = create_test_server().await;
    let id = create_full_tournament(&app).await;
    let uri = format!("/api/v1/tournaments/{id}");

    let (status, _) = send(&app, "DELETE", &uri, Some(token(1, false)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "DELETE", &uri, Some(token(ADMIN, true)), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
