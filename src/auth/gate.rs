//! Route Gate: request-time check that a credential is present and shaped
//! like a structured token before a workspace page is served.
//!
//! The gate never calls the provider and never fails; it only branches into
//! pass-through or a redirect to the login page.

use super::{
    config::{AuthConfig, LOGIN_PATH},
    cookies::{CookieJar, SetCookie, append_set_cookies},
    state::AuthState,
    sync::SessionSync,
    token::SessionToken,
};
use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, EXPIRES, LOCATION, PRAGMA},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{Span, debug, error};
use url::form_urlencoded;

#[derive(Debug)]
pub enum GateDecision {
    /// Allow-listed path; the gate does not apply.
    Public,
    /// Credential present and well-formed.
    Allow(SessionToken),
    /// Fail closed. `purge` deletes a malformed credential.
    Redirect {
        location: String,
        purge: Vec<SetCookie>,
    },
}

impl GateDecision {
    /// Short name recorded on the request span.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Allow(_) => "allow",
            Self::Redirect { purge, .. } if purge.is_empty() => "redirect",
            Self::Redirect { .. } => "redirect-purge",
        }
    }
}

/// Decide what to do with a request for `target` (path and optional query)
/// carrying `jar`. The query is kept in the return destination.
#[must_use]
pub fn evaluate(config: &AuthConfig, target: &str, jar: &CookieJar) -> GateDecision {
    let path = target.split_once('?').map_or(target, |(path, _)| path);
    if config.is_public_path(path) {
        return GateDecision::Public;
    }

    let Some(raw) = jar.get(config.cookie_name()) else {
        return GateDecision::Redirect {
            location: login_location(target),
            purge: Vec::new(),
        };
    };

    match SessionToken::parse(raw) {
        Some(token) => GateDecision::Allow(token),
        None => GateDecision::Redirect {
            location: login_location(target),
            purge: SessionSync::new(config).discard_credential(),
        },
    }
}

/// `/login?from=<target>` with the target percent-encoded.
#[must_use]
pub fn login_location(from: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(from.as_bytes()).collect();
    format!("{LOGIN_PATH}?from={encoded}")
}

/// Keep browsers and proxies from replaying an authorization decision.
pub fn no_cache(headers: &mut HeaderMap) {
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

/// Redirect response carrying `cookies`, never cached.
#[must_use]
pub fn redirect(status: StatusCode, location: &str, cookies: &[SetCookie]) -> Response {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(LOCATION, value);
        }
        Err(err) => {
            error!("Invalid redirect location: {err}");
            headers.insert(LOCATION, HeaderValue::from_static("/"));
        }
    }
    append_set_cookies(&mut headers, cookies);
    no_cache(&mut headers);
    (status, headers).into_response()
}

/// Axum middleware wrapping every route.
pub async fn route_gate(
    State(auth): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string);

    let decision = evaluate(auth.config(), &target, &jar);
    Span::current().record("auth.gate", decision.label());

    match decision {
        GateDecision::Public => next.run(request).await,
        GateDecision::Allow(token) => {
            if let Some(user) = token.user() {
                request.extensions_mut().insert(user);
            }
            request.extensions_mut().insert(token);
            let mut response = next.run(request).await;
            no_cache(response.headers_mut());
            response
        }
        GateDecision::Redirect { location, purge } => {
            debug!(
                target = %target,
                malformed = !purge.is_empty(),
                "No usable credential, redirecting to login"
            );
            redirect(StatusCode::TEMPORARY_REDIRECT, &location, &purge)
        }
    }
}
