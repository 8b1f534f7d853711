//! HTTP client for a token-endpoint style identity provider.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST auth/v1/token?grant_type=password` exchanges credentials for a session.
//! - `GET auth/v1/user` resolves a bearer token into its user.
//! - `POST auth/v1/logout` revokes the bearer token's session.
//!
//! Every request carries the public client key in the `apikey` header.

use super::{IdentityProvider, ProviderError, ProviderFuture, ProviderUser, Session};
use crate::{APP_USER_AGENT, auth::token::SessionToken};
use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::{Instrument, debug, info_span};
use url::Url;

const TOKEN_PATH: &str = "auth/v1/token";
const USER_PATH: &str = "auth/v1/user";
const LOGOUT_PATH: &str = "auth/v1/logout";
const API_KEY_HEADER: &str = "apikey";

/// Error body keys, most descriptive first.
const ERROR_MESSAGE_KEYS: [&str; 4] = ["error_description", "msg", "message", "error"];
const DISPLAY_NAME_KEYS: [&str; 3] = ["display_name", "full_name", "name"];

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<WireUser>,
}

#[derive(Deserialize)]
struct WireUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl From<WireUser> for ProviderUser {
    fn from(user: WireUser) -> Self {
        let display_name = DISPLAY_NAME_KEYS
            .iter()
            .find_map(|key| user.user_metadata.get(key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string);
        Self {
            id: user.id,
            email: user.email,
            display_name,
        }
    }
}

pub struct HttpIdentityProvider {
    base_url: Url,
    api_key: SecretString,
    client: Client,
}

impl HttpIdentityProvider {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid provider URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Provider URL cannot be used as a base: {base_url}"));
        }
        // Keep any path prefix when joining endpoint paths.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build identity provider client")?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|err| ProviderError::InvalidResponse(format!("invalid endpoint {path}: {err}")))
    }

    async fn password_grant(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Option<Session>, ProviderError> {
        let mut url = self.endpoint(TOKEN_PATH)?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&PasswordGrant {
                email,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        if body.access_token.is_none() && body.user.is_none() {
            debug!("Identity provider returned neither a session nor an error");
            return Ok(None);
        }

        let expires_at = body
            .expires_at
            .or_else(|| body.expires_in.and_then(|seconds| unix_now().checked_add(seconds)));
        Ok(Some(Session {
            access_token: body.access_token.filter(|token| !token.is_empty()),
            expires_at,
            user: body.user.map(ProviderUser::from).unwrap_or_default(),
        }))
    }

    async fn current_user(&self, access_token: &str) -> Result<Option<Session>, ProviderError> {
        let response = self
            .client
            .get(self.endpoint(USER_PATH)?)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("Identity provider no longer recognises the session");
                return Ok(None);
            }
            status if !status.is_success() => return Err(error_from_response(response).await),
            _ => {}
        }

        let user: WireUser = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        Ok(Some(Session {
            access_token: Some(access_token.to_string()),
            expires_at: SessionToken::parse(access_token).and_then(|token| token.expires_at()),
            user: user.into(),
        }))
    }

    async fn revoke(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(self.endpoint(LOGOUT_PATH)?)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        // An unknown or expired session is already signed out.
        if status.is_success() || status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND
        {
            return Ok(());
        }
        Err(error_from_response(response).await)
    }
}

impl IdentityProvider for HttpIdentityProvider {
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> ProviderFuture<'a, Option<Session>> {
        let span = info_span!("provider.sign_in", http.method = "POST");
        Box::pin(self.password_grant(email, password).instrument(span))
    }

    fn get_session<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, Option<Session>> {
        let span = info_span!("provider.get_session", http.method = "GET");
        Box::pin(self.current_user(access_token).instrument(span))
    }

    fn sign_out<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, ()> {
        let span = info_span!("provider.sign_out", http.method = "POST");
        Box::pin(self.revoke(access_token).instrument(span))
    }
}

impl fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpIdentityProvider")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .finish_non_exhaustive()
    }
}

fn unavailable(err: reqwest::Error) -> ProviderError {
    ProviderError::Unavailable(err.without_url().to_string())
}

async fn error_from_response(response: Response) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    });

    if status.is_client_error() {
        ProviderError::Rejected {
            status: status.as_u16(),
            message,
        }
    } else {
        ProviderError::Unavailable(message)
    }
}

/// Pull a human readable message out of a provider error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    ERROR_MESSAGE_KEYS
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(ToString::to_string)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
}
