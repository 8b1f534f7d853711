//! Session introspection for scripts and the workspace front end.

use crate::auth::{AuthState, CookieJar, SessionToken};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Unix seconds, when the provider or the token says so.
    pub expires_at: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Session is live", body = SessionResponse),
        (status = 204, description = "No live session"),
        (status = 502, description = "Identity provider could not be reached")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth: Extension<Arc<AuthState>>) -> Response {
    // Missing or malformed credentials are "no session", never an error.
    let Some(token) = extract_session_token(&headers, auth.config().cookie_name()) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match auth.provider().get_session(token.as_str()).await {
        Ok(Some(session)) => {
            let expires_at = session
                .expires_at
                .or_else(|| session.token().and_then(|live| live.expires_at()))
                .or_else(|| token.expires_at());
            let response = SessionResponse {
                user_id: session.user.id,
                email: session.user.email,
                display_name: session.user.display_name,
                expires_at,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to look up session: {err}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

/// Bearer header first, then the credential cookie.
fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<SessionToken> {
    if let Some(token) = extract_bearer_token(headers) {
        return SessionToken::parse(&token);
    }
    CookieJar::from_headers(headers)
        .get(cookie_name)
        .and_then(SessionToken::parse)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
