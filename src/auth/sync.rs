//! Session Synchronizer: the only writer of the credential cookie.
//!
//! Every flow goes through `clear`, `commit` and `reconcile` instead of
//! scanning cookies on its own.

use super::{
    config::AuthConfig,
    cookies::{CookieJar, SetCookie, is_cookie_value},
    error::AuthError,
    token::{AuthenticatedUser, SessionToken},
};
use crate::provider::{IdentityProvider, ProviderError, Session};
use tracing::{debug, warn};

/// Result of comparing the provider's live session with the cookie.
#[derive(Debug)]
pub enum Reconciled {
    /// The provider still honours a session; `token` is what must be stored.
    Live {
        token: SessionToken,
        user: AuthenticatedUser,
    },
    NoSession,
    /// The provider could not be asked. Callers fall back to the login form.
    CheckFailed(ProviderError),
}

#[derive(Debug)]
pub struct Reconciliation {
    /// Deletions to send regardless of the outcome.
    pub purge: Vec<SetCookie>,
    pub outcome: Reconciled,
}

pub struct SessionSync<'a> {
    config: &'a AuthConfig,
}

impl<'a> SessionSync<'a> {
    #[must_use]
    pub fn new(config: &'a AuthConfig) -> Self {
        Self { config }
    }

    /// Deletions for the credential under both the site-wide path and the
    /// browser's default path.
    #[must_use]
    pub fn discard_credential(&self) -> Vec<SetCookie> {
        let name = self.config.cookie_name();
        vec![
            self.harden(SetCookie::removal(name)),
            self.harden(SetCookie::pathless_removal(name)),
        ]
    }

    /// Last-resort overwrite with a past expiry, for clients that ignored a
    /// `Max-Age=0` deletion.
    #[must_use]
    pub fn expire_credential(&self) -> SetCookie {
        self.harden(SetCookie::force_expire(self.config.cookie_name()))
    }

    /// Purge the credential and every provider-reserved cookie the browser sent.
    #[must_use]
    pub fn clear(&self, jar: &CookieJar) -> Vec<SetCookie> {
        let credential = self.config.cookie_name();
        let mut cookies = self.discard_credential();
        for stale in jar.names_with_prefix(self.config.provider_cookie_prefix()) {
            if stale == credential {
                continue;
            }
            debug!(cookie = stale, "Purging provider-reserved cookie");
            cookies.push(SetCookie::removal(stale));
            cookies.push(SetCookie::pathless_removal(stale));
        }
        cookies
    }

    /// Cookie storing `token` as the single authoritative credential.
    ///
    /// # Errors
    /// `AuthError::NoAccessToken` when the token cannot be stored as a cookie
    /// value.
    pub fn commit(&self, token: &SessionToken) -> Result<SetCookie, AuthError> {
        if !is_cookie_value(token.as_str()) {
            warn!("Access token holds characters a cookie cannot carry");
            return Err(AuthError::NoAccessToken);
        }
        Ok(
            self.harden(SetCookie::new(self.config.cookie_name(), token.as_str()))
                .with_max_age(self.config.cookie_max_age_seconds()),
        )
    }

    /// Purge followed by a commit in the same response. Credential deletions
    /// are dropped so the commit is the last word on that cookie.
    ///
    /// # Errors
    /// Same as [`SessionSync::commit`].
    pub fn commit_after(
        &self,
        purge: Vec<SetCookie>,
        token: &SessionToken,
    ) -> Result<Vec<SetCookie>, AuthError> {
        let commit = self.commit(token)?;
        let credential = self.config.cookie_name();
        let mut cookies: Vec<SetCookie> = purge
            .into_iter()
            .filter(|cookie| cookie.name() != credential)
            .collect();
        cookies.push(commit);
        Ok(cookies)
    }

    /// Start from a clean slate, then ask the provider whether the presented
    /// credential still maps to a live session.
    pub async fn reconcile(
        &self,
        jar: &CookieJar,
        provider: &dyn IdentityProvider,
    ) -> Reconciliation {
        let purge = self.clear(jar);
        let presented = jar
            .get(self.config.cookie_name())
            .and_then(SessionToken::parse);

        let Some(presented) = presented else {
            return Reconciliation {
                purge,
                outcome: Reconciled::NoSession,
            };
        };

        let outcome = match provider.get_session(presented.as_str()).await {
            Ok(Some(session)) => live(&session, &presented),
            Ok(None) => Reconciled::NoSession,
            Err(err) => {
                warn!("Session check failed: {err}");
                Reconciled::CheckFailed(err)
            }
        };

        Reconciliation { purge, outcome }
    }

    fn harden(&self, cookie: SetCookie) -> SetCookie {
        cookie
            .with_http_only(true)
            .with_same_site(self.config.cookie_same_site())
            .with_secure(self.config.cookie_secure())
    }
}

fn live(session: &Session, presented: &SessionToken) -> Reconciled {
    let Some(token) = session.token() else {
        return Reconciled::NoSession;
    };
    if token != *presented {
        debug!("Provider returned a newer access token");
    }
    let user = token
        .user()
        .unwrap_or_else(|| session.user.to_authenticated());
    Reconciled::Live { token, user }
}
