//! Session configuration shared by the gate and the flows.

use super::cookies::SameSite;
use std::time::Duration;

pub const DEFAULT_COOKIE_NAME: &str = "stagecall_session";
pub const DEFAULT_PROVIDER_COOKIE_PREFIX: &str = "idp-";
const DEFAULT_COOKIE_MAX_AGE_SECONDS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_SIGN_OUT_TIMEOUT_SECONDS: u64 = 5;

pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";

/// Path prefixes that never pass through the route gate.
const PUBLIC_PREFIXES: [&str; 5] = [LOGIN_PATH, LOGOUT_PATH, "/api", "/assets", "/health"];

#[derive(Clone, Debug)]
pub struct AuthConfig {
    public_base_url: String,
    cookie_name: String,
    cookie_max_age_seconds: u64,
    cookie_same_site: SameSite,
    provider_cookie_prefix: String,
    sign_out_timeout: Duration,
    public_prefixes: Vec<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(public_base_url: String) -> Self {
        Self {
            public_base_url,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_max_age_seconds: DEFAULT_COOKIE_MAX_AGE_SECONDS,
            cookie_same_site: SameSite::default(),
            provider_cookie_prefix: DEFAULT_PROVIDER_COOKIE_PREFIX.to_string(),
            sign_out_timeout: Duration::from_secs(DEFAULT_SIGN_OUT_TIMEOUT_SECONDS),
            public_prefixes: PUBLIC_PREFIXES.iter().map(ToString::to_string).collect(),
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: String) -> Self {
        self.cookie_name = name;
        self
    }

    #[must_use]
    pub fn with_cookie_max_age_seconds(mut self, seconds: u64) -> Self {
        self.cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    #[must_use]
    pub fn with_provider_cookie_prefix(mut self, prefix: String) -> Self {
        self.provider_cookie_prefix = prefix;
        self
    }

    #[must_use]
    pub fn with_sign_out_timeout(mut self, timeout: Duration) -> Self {
        self.sign_out_timeout = timeout;
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn cookie_max_age_seconds(&self) -> u64 {
        self.cookie_max_age_seconds
    }

    #[must_use]
    pub fn cookie_same_site(&self) -> SameSite {
        self.cookie_same_site
    }

    #[must_use]
    pub fn provider_cookie_prefix(&self) -> &str {
        &self.provider_cookie_prefix
    }

    #[must_use]
    pub fn sign_out_timeout(&self) -> Duration {
        self.sign_out_timeout
    }

    /// Mark cookies secure only when the site is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }

    /// Whether `path` bypasses the route gate.
    ///
    /// Prefixes match whole segments (`/api` and `/api/...`, not `/apiary`).
    /// Any path with a dot is treated as a static file.
    #[must_use]
    pub fn is_public_path(&self, path: &str) -> bool {
        if path.contains('.') {
            return true;
        }
        self.public_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}
