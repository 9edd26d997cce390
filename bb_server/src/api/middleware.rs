//! Authentication middleware for protected endpoints.
//!
//! Verifies the bearer token and injects the [`Caller`] it describes into
//! request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use blog_bracket::Caller;
//!
//! async fn protected_handler(Extension(caller): Extension<Caller>) -> String {
//!     format!("Authenticated as user {}", caller.user_id)
//! }
//! # let _ = protected_handler;
//! ```

use super::AppState;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use blog_bracket::{Caller, UserId};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: UserId,
    #[serde(default)]
    pub admin: bool,
    /// Expiry (unix seconds)
    pub exp: i64,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller {
            user_id: claims.sub,
            is_admin: claims.admin,
        }
    }
}

/// Decode and validate an access token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Reject requests without a valid `Authorization: Bearer <token>` header.
///
/// - **Success**: injects `Caller` into request extensions
/// - **Missing header, bad format, invalid or expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_token(token, &state.jwt_secret) {
        Ok(claims) => {
            request.extensions_mut().insert(Caller::from(claims));
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
