//! Tournament API handlers.
//!
//! Reads are public. Every mutation needs a bearer token; creating,
//! starting, deleting and vote resets additionally need an admin token.
//!
//! # Examples
//!
//! Create a tournament:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Spring Cup", "size": 8, "match_duration_mins": 15}'
//! ```
//!
//! Vote in the first match:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/tournaments/1/matches/0/vote \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"pick": "A"}'
//! ```

use super::{AppState, request_id::RequestId};
use crate::metrics;
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use blog_bracket::{
    BracketSize, Caller, EntryId, ListQuery, Match, Registration, SchedulePolicy, Tournament,
    TournamentConfig, TournamentError, TournamentId, TournamentPage, TournamentStats,
    TournamentStatus, VoteOutcome,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Largest page a client may request
const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status_for(error: &TournamentError) -> StatusCode {
    match error {
        TournamentError::NotFound(_) => StatusCode::NOT_FOUND,
        TournamentError::Forbidden(_) => StatusCode::FORBIDDEN,
        TournamentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        TournamentError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn api_error(error: TournamentError) -> ApiError {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!(error = %error, "Tournament operation failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: error.client_message(),
        }),
    )
}

/// A tournament together with its derived bracket position
#[derive(Debug, Serialize)]
pub struct TournamentView {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub total_rounds: u32,
    pub current_round: u32,
    /// Index of the match currently open for votes
    pub live_match: Option<usize>,
}

impl TournamentView {
    /// View of `tournament` as observed at `now`
    pub fn at(tournament: Tournament, now: DateTime<Utc>) -> Self {
        Self {
            total_rounds: tournament.total_rounds(),
            current_round: tournament.current_round(),
            live_match: tournament.live_match(now),
            tournament,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TournamentListResponse {
    pub tournaments: Vec<TournamentView>,
    pub page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl TournamentListResponse {
    pub fn at(page: TournamentPage, now: DateTime<Utc>) -> Self {
        Self {
            tournaments: page
                .tournaments
                .into_iter()
                .map(|t| TournamentView::at(t, now))
                .collect(),
            page: page.page,
            total: page.total,
            total_pages: page.total_pages,
            has_next: page.has_next,
            has_prev: page.has_prev,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<TournamentStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        let defaults = ListQuery::default();
        Self {
            status: params.status,
            page: params.page.unwrap_or(defaults.page).max(1),
            limit: params.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_LIMIT),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    /// Bracket capacity: 4, 8, 16 or 32
    pub size: usize,
    pub match_duration_mins: Option<i64>,
    pub schedule: Option<SchedulePolicy>,
}

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub entry_id: EntryId,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// `"A"` or `"B"`
    pub pick: String,
}

/// List tournaments, newest first.
///
/// Query: `status` (`draft`, `active`, `completed`), `page` (from 1), `limit` (1-100, default 50).
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<TournamentListResponse> {
    let query = ListQuery::from(params);
    let now = Utc::now();
    state
        .manager
        .list_tournaments(now, &query)
        .await
        .map(|page| Json(TournamentListResponse::at(page, now)))
        .map_err(api_error)
}

pub async fn tournament_stats(State(state): State<AppState>) -> ApiResult<TournamentStats> {
    state
        .manager
        .tournament_stats(Utc::now())
        .await
        .map(Json)
        .map_err(api_error)
}

/// Get a tournament, settling any elapsed matches first.
///
/// # Errors
///
/// - `404 Not Found`: Tournament doesn't exist
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<TournamentView> {
    let now = Utc::now();
    state
        .manager
        .get_tournament(id, now)
        .await
        .map(|t| Json(TournamentView::at(t, now)))
        .map_err(api_error)
}

/// Create a draft tournament (admin only).
///
/// # Errors
///
/// - `400 Bad Request`: Size not 4/8/16/32, empty name or non-positive duration
/// - `403 Forbidden`: Caller is not an administrator
pub async fn create_tournament(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CreateTournamentRequest>,
) -> Result<(StatusCode, Json<TournamentView>), ApiError> {
    caller
        .require_admin("create a tournament")
        .map_err(api_error)?;

    let size = BracketSize::try_from(request.size).map_err(api_error)?;
    let minutes = request
        .match_duration_mins
        .unwrap_or(state.defaults.match_duration_mins);
    let duration = TimeDelta::try_minutes(minutes)
        .ok_or(TournamentError::InvalidDuration(minutes.saturating_mul(60)))
        .map_err(api_error)?;
    let config = TournamentConfig::new(request.name, size)
        .with_match_duration(duration)
        .with_schedule(request.schedule.unwrap_or(state.defaults.schedule));

    let now = Utc::now();
    let tournament = state
        .manager
        .create_tournament(config, caller.user_id, now)
        .await
        .map_err(api_error)?;

    metrics::tournaments_created_total();
    tracing::info!(
        request_id = %request_id.as_str(),
        tournament_id = tournament.id,
        user_id = caller.user_id,
        "Tournament created"
    );

    Ok((StatusCode::CREATED, Json(TournamentView::at(tournament, now))))
}

/// Register an entry owned by the caller.
///
/// # Errors
///
/// - `400 Bad Request`: Not a draft, full, duplicate entry or owner
/// - `403 Forbidden`: Caller does not own the entry
/// - `404 Not Found`: Tournament or entry doesn't exist
pub async fn register_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<TournamentId>,
    Json(request): Json<EntryRequest>,
) -> ApiResult<TournamentView> {
    let now = Utc::now();
    state
        .manager
        .register_entry(id, request.entry_id, caller, now)
        .await
        .map(|t| Json(TournamentView::at(t, now)))
        .map_err(api_error)
}

/// Withdraw an entry from a draft tournament (its owner or an admin).
pub async fn withdraw_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<TournamentId>,
    Json(request): Json<EntryRequest>,
) -> ApiResult<Registration> {
    state
        .manager
        .withdraw_entry(id, request.entry_id, caller, Utc::now())
        .await
        .map(Json)
        .map_err(api_error)
}

/// Build round one (admin only). The bracket must be full.
pub async fn start_tournament(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<TournamentId>,
) -> ApiResult<TournamentView> {
    let now = Utc::now();
    state
        .manager
        .start_tournament(id, caller, now)
        .await
        .map(|t| Json(TournamentView::at(t, now)))
        .map_err(api_error)
}

/// Vote in a match as the authenticated user.
///
/// A vote arriving after the window closed is not an error: the response
/// is the finished match.
///
/// # Errors
///
/// - `400 Bad Request`: Tournament not active, too early, already voted or bad pick
/// - `404 Not Found`: Tournament or match doesn't exist
pub async fn vote(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((id, index)): Path<(TournamentId, usize)>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Match> {
    let result = state
        .manager
        .cast_vote(id, index, caller.user_id, request.pick, Utc::now())
        .await;

    match result {
        Ok((outcome, m)) => {
            metrics::votes_total(vote_label(outcome));
            Ok(Json(m))
        }
        Err(e) => {
            metrics::votes_total("rejected");
            Err(api_error(e))
        }
    }
}

fn vote_label(outcome: VoteOutcome) -> &'static str {
    match outcome {
        VoteOutcome::Recorded => "recorded",
        VoteOutcome::Closed => "closed",
    }
}

/// Clear the votes of an unfinished match (admin only).
pub async fn reset_match_votes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path((id, index)): Path<(TournamentId, usize)>,
) -> ApiResult<Match> {
    state
        .manager
        .reset_match_votes(id, index, caller, Utc::now())
        .await
        .map(Json)
        .map_err(api_error)
}

/// Delete a tournament (admin only).
pub async fn delete_tournament(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<TournamentId>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .delete_tournament(id, caller)
        .await
        .map_err(api_error)?;

    tracing::info!(
        request_id = %request_id.as_str(),
        tournament_id = id,
        user_id = caller.user_id,
        "Tournament deleted"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_bracket::{StoreError, tournament::Missing};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&TournamentError::NotFound(Missing::Tournament(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&TournamentError::Forbidden("no".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&TournamentError::Storage(StoreError::Backend("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&TournamentError::Unavailable(1)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&TournamentError::AlreadyVoted),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&TournamentError::InvalidCapacity(5)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_vote_labels_follow_outcome() {
        assert_eq!(vote_label(VoteOutcome::Recorded), "recorded");
        assert_eq!(vote_label(VoteOutcome::Closed), "closed");
    }

    #[test]
    fn test_list_params_defaults_and_clamping() {
        let query = ListQuery::from(ListParams {
            status: None,
            page: None,
            limit: None,
        });
        assert_eq!(query, ListQuery::default());

        let query = ListQuery::from(ListParams {
            status: Some(TournamentStatus::Active),
            page: Some(0),
            limit: Some(10_000),
        });
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_LIMIT);
        assert_eq!(query.status, Some(TournamentStatus::Active));
    }
}
