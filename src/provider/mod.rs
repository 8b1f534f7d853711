//! Auth Client: the calls made to the external identity provider.
//!
//! Flows depend on [`IdentityProvider`] only, so tests can swap the HTTP
//! client for an in-memory one.

pub mod http;

pub use http::HttpIdentityProvider;

use crate::auth::token::{AuthenticatedUser, SessionToken};
use secrecy::SecretString;
use std::{fmt, future::Future, pin::Pin};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the request (bad credentials, invalid grant).
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

pub trait IdentityProvider: Send + Sync {
    /// Exchange email and password for a session. `Ok(None)` means the
    /// provider answered without a session and without an error.
    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> ProviderFuture<'a, Option<Session>>;

    /// Live session bound to `access_token`, or `Ok(None)` if the provider no
    /// longer recognises it.
    fn get_session<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, Option<Session>>;

    /// Invalidate the provider-side session.
    fn sign_out<'a>(&'a self, access_token: &'a str) -> ProviderFuture<'a, ()>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderUser {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl ProviderUser {
    #[must_use]
    pub fn to_authenticated(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            identifier: self.email.clone().unwrap_or_else(|| self.id.clone()),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub user: ProviderUser,
}

impl Session {
    /// The session's access token, if present and well-formed.
    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.access_token.as_deref().and_then(SessionToken::parse)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}
