//! Login flow as an explicit state machine.
//!
//! `Initializing -> CheckingSession -> { FormVisible | Redirecting }` on page
//! load, and `FormVisible -> { FormVisible | Redirecting }` on submit.
//! `Redirecting` is terminal: the HTTP layer answers with a full redirect so
//! the route gate runs again with the freshly written cookie.

use super::{
    config::{LOGIN_PATH, LOGOUT_PATH},
    cookies::{CookieJar, SetCookie},
    error::AuthError,
    state::AuthState,
    sync::{Reconciled, Reconciliation},
};
use crate::provider::Session;
use axum::http::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

pub const DEFAULT_DESTINATION: &str = "/";

/// Transient banner shown above the login form.
#[derive(Debug)]
pub enum Notice {
    SignedOut,
    /// Local state was cleared but the provider could not be reached.
    SignedOutLocally,
    SessionCheckFailed,
    Failed(AuthError),
}

impl Notice {
    /// Notices that can travel in the `notice` query parameter.
    #[must_use]
    pub fn from_query(value: Option<&str>) -> Option<Self> {
        match value? {
            "signed-out" => Some(Self::SignedOut),
            "signed-out-locally" => Some(Self::SignedOutLocally),
            _ => None,
        }
    }

    #[must_use]
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Self::SignedOut => Some("signed-out"),
            Self::SignedOutLocally => Some("signed-out-locally"),
            Self::SessionCheckFailed | Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::SignedOut => "You have been signed out.".to_string(),
            Self::SignedOutLocally => {
                "You have been signed out on this device. The identity provider could not be reached to end the session everywhere.".to_string()
            }
            Self::SessionCheckFailed => {
                "Your session could not be verified. Please sign in again.".to_string()
            }
            Self::Failed(err) => err.to_string(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SessionCheckFailed | Self::Failed(_))
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Failed(err) => err.status_code(),
            _ => StatusCode::OK,
        }
    }
}

#[derive(Debug)]
pub enum LoginState {
    Initializing,
    CheckingSession,
    FormVisible { notice: Option<Notice> },
    Redirecting { location: String },
}

impl LoginState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::CheckingSession => "checking-session",
            Self::FormVisible { .. } => "form-visible",
            Self::Redirecting { .. } => "redirecting",
        }
    }
}

/// Submitted form values.
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// What the HTTP layer must render or send.
#[derive(Debug)]
pub struct LoginOutcome {
    pub state: LoginState,
    pub cookies: Vec<SetCookie>,
    /// Sanitized return destination, kept in the form between attempts.
    pub destination: String,
    /// Email to pre-fill after a failed attempt.
    pub email: Option<String>,
}

impl LoginOutcome {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match &self.state {
            LoginState::Redirecting { .. } => StatusCode::SEE_OTHER,
            LoginState::FormVisible {
                notice: Some(notice),
            } => notice.status_code(),
            _ => StatusCode::OK,
        }
    }
}

/// Only local absolute paths are valid destinations; anything else, and the
/// auth pages themselves, fall back to `/`.
#[must_use]
pub fn sanitize_destination(from: Option<&str>) -> String {
    let Some(candidate) = from.map(str::trim).filter(|from| !from.is_empty()) else {
        return DEFAULT_DESTINATION.to_string();
    };
    let local = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.contains('\\')
        && candidate.chars().all(|c| c.is_ascii_graphic());
    if !local {
        return DEFAULT_DESTINATION.to_string();
    }
    let path = candidate.split(['?', '#']).next().unwrap_or(candidate);
    let is_auth_page = [LOGIN_PATH, LOGOUT_PATH].iter().any(|page| {
        path.strip_prefix(page)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    });
    if is_auth_page {
        return DEFAULT_DESTINATION.to_string();
    }
    candidate.to_string()
}

pub struct LoginFlow<'a> {
    auth: &'a AuthState,
    destination: String,
    state: LoginState,
}

impl<'a> LoginFlow<'a> {
    #[must_use]
    pub fn new(auth: &'a AuthState, from: Option<&str>) -> Self {
        Self {
            auth,
            destination: sanitize_destination(from),
            state: LoginState::Initializing,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LoginState {
        &self.state
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Page load: reconcile, then show the form or resume the live session.
    pub async fn mount(mut self, jar: &CookieJar, notice: Option<Notice>) -> LoginOutcome {
        self.transition(LoginState::CheckingSession);

        let auth = self.auth;
        let sync = auth.sync();
        let Reconciliation { purge, outcome } = sync.reconcile(jar, auth.provider()).await;

        match outcome {
            Reconciled::Live { token, user } => match sync.commit_after(purge, &token) {
                Ok(cookies) => {
                    info!(user = %user.identifier, "Live session found, resuming");
                    self.finish_redirect(cookies)
                }
                Err(_) => self.finish_form(sync.clear(jar), Some(Notice::SessionCheckFailed), None),
            },
            Reconciled::NoSession => self.finish_form(purge, notice, None),
            Reconciled::CheckFailed(_) => {
                self.finish_form(purge, Some(Notice::SessionCheckFailed), None)
            }
        }
    }

    /// Form submission.
    pub async fn submit(mut self, jar: &CookieJar, credentials: Credentials) -> LoginOutcome {
        self.transition(LoginState::FormVisible { notice: None });

        let email = credentials.email.trim().to_string();
        if email.is_empty() || credentials.password.expose_secret().is_empty() {
            debug!("Login rejected before contacting the provider: missing fields");
            let prefill = Some(email).filter(|email| !email.is_empty());
            return self.fail(Vec::new(), AuthError::MissingInformation, prefill);
        }

        let auth = self.auth;
        let sync = auth.sync();
        let purge = sync.clear(jar);

        let result = auth
            .provider()
            .sign_in_with_password(&email, &credentials.password)
            .await;

        match result {
            Err(err) => {
                warn!("Sign-in failed: {err}");
                self.fail(purge, err.into(), Some(email))
            }
            Ok(session) => match session.as_ref().and_then(Session::token) {
                Some(token) => match sync.commit_after(purge, &token) {
                    Ok(cookies) => {
                        info!("Login successful");
                        self.finish_redirect(cookies)
                    }
                    Err(err) => self.fail(sync.clear(jar), err, Some(email)),
                },
                None => {
                    warn!("Sign-in succeeded without a usable access token");
                    self.fail(purge, AuthError::NoAccessToken, Some(email))
                }
            },
        }
    }

    fn transition(&mut self, next: LoginState) {
        debug!(from = self.state.name(), to = next.name(), "Login state change");
        self.state = next;
    }

    fn fail(self, cookies: Vec<SetCookie>, err: AuthError, email: Option<String>) -> LoginOutcome {
        self.finish_form(cookies, Some(Notice::Failed(err)), email)
    }

    fn finish_form(
        mut self,
        cookies: Vec<SetCookie>,
        notice: Option<Notice>,
        email: Option<String>,
    ) -> LoginOutcome {
        self.transition(LoginState::FormVisible { notice });
        LoginOutcome {
            state: self.state,
            cookies,
            destination: self.destination,
            email,
        }
    }

    fn finish_redirect(mut self, cookies: Vec<SetCookie>) -> LoginOutcome {
        let location = self.destination.clone();
        self.transition(LoginState::Redirecting { location });
        LoginOutcome {
            state: self.state,
            cookies,
            destination: self.destination,
            email: None,
        }
    }
}
