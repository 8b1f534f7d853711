//! Sign-out. Local state is cleared first; the provider is told last and may
//! fail without changing where the user ends up.

use super::{
    config::LOGIN_PATH, cookies::CookieJar, cookies::SetCookie, login::Notice, state::AuthState,
    token::SessionToken,
};
use tokio::time::timeout;
use tracing::{info, warn};

/// `Clear-Site-Data` value asking the browser to drop site storage.
pub const CLEAR_SITE_DATA: &str = "\"storage\"";

#[derive(Debug)]
pub struct LogoutReport {
    /// Deletions to send with the redirect.
    pub cookies: Vec<SetCookie>,
    /// `false` when the provider could not confirm the sign-out.
    pub provider_signed_out: bool,
    /// Whether an expired overwrite was added for a lingering credential.
    pub force_expired: bool,
}

impl LogoutReport {
    #[must_use]
    pub fn notice(&self) -> Notice {
        if self.provider_signed_out {
            Notice::SignedOut
        } else {
            Notice::SignedOutLocally
        }
    }

    /// Login page carrying the sign-out notice.
    #[must_use]
    pub fn location(&self) -> String {
        match self.notice().query_value() {
            Some(notice) => format!("{LOGIN_PATH}?notice={notice}"),
            None => LOGIN_PATH.to_string(),
        }
    }
}

/// Clear every local credential and end the provider session, best effort.
pub async fn run(auth: &AuthState, jar: &CookieJar) -> LogoutReport {
    let config = auth.config();
    let sync = auth.sync();
    let mut cookies = sync.clear(jar);

    let presented = jar.get(config.cookie_name());
    let provider_signed_out = match presented.and_then(SessionToken::parse) {
        Some(token) => {
            match timeout(config.sign_out_timeout(), auth.provider().sign_out(token.as_str())).await
            {
                Ok(Ok(())) => true,
                Ok(Err(err)) => {
                    warn!("Provider sign-out failed: {err}");
                    false
                }
                Err(_) => {
                    warn!(
                        timeout_seconds = config.sign_out_timeout().as_secs(),
                        "Provider sign-out timed out"
                    );
                    false
                }
            }
        }
        None => true,
    };

    let force_expired = presented.is_some();
    if force_expired {
        cookies.push(sync.expire_credential());
    }

    info!(provider_signed_out, "Signed out");

    LogoutReport {
        cookies,
        provider_signed_out,
        force_expired,
    }
}
