//! Credential Store primitives: reading the request cookie jar and building
//! `Set-Cookie` values.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use std::{fmt, str::FromStr};
use tracing::error;

/// `Expires` value used to force a cookie out of the browser.
const EPOCH_HTTP_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Whether `value` only holds RFC 6265 `cookie-octet` characters and can be
/// stored without quoting.
#[must_use]
pub fn is_cookie_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

/// Cookies presented with a request, in header order.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    /// Collect every `Cookie` header (HTTP/2 may split them).
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut pairs = Vec::new();
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let Some(name) = parts.next().map(str::trim).filter(|name| !name.is_empty())
                else {
                    continue;
                };
                let value = parts.next().map_or("", str::trim);
                pairs.push((name.to_string(), value.trim_matches('"').to_string()));
            }
        }
        Self { pairs }
    }

    /// First value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Distinct cookie names starting with `prefix`.
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let mut seen: Vec<&str> = Vec::new();
        self.pairs.iter().filter_map(move |(name, _)| {
            if prefix.is_empty() || !name.starts_with(prefix) || seen.contains(&name.as_str()) {
                return None;
            }
            seen.push(name);
            Some(name.as_str())
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
}

impl SameSite {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            other => Err(format!("invalid SameSite policy: {other} (expected lax or strict)")),
        }
    }
}

/// One `Set-Cookie` header value.
#[derive(Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: Option<&'static str>,
    max_age: Option<u64>,
    expired: bool,
    same_site: Option<SameSite>,
    secure: bool,
    http_only: bool,
}

impl SetCookie {
    /// Site-wide cookie carrying `value`.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: Some("/"),
            max_age: None,
            expired: false,
            same_site: None,
            secure: false,
            http_only: false,
        }
    }

    /// Site-wide deletion (`Max-Age=0`).
    #[must_use]
    pub fn removal(name: &str) -> Self {
        Self::new(name, "").with_max_age(0)
    }

    /// Deletion without a `Path` attribute, for cookies written with the
    /// browser's default path.
    #[must_use]
    pub fn pathless_removal(name: &str) -> Self {
        Self {
            path: None,
            ..Self::removal(name)
        }
    }

    /// Overwrite with an already-past expiry.
    #[must_use]
    pub fn force_expire(name: &str) -> Self {
        Self {
            expired: true,
            ..Self::removal(name)
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path
    }

    /// `true` when the header removes the cookie instead of storing it.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        self.expired || self.max_age == Some(0)
    }

    /// # Errors
    /// Returns an error if the name or value holds characters not allowed in headers.
    pub fn to_header_value(&self) -> Result<HeaderValue, axum::http::header::InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = self.path {
            write!(f, "; Path={path}")?;
        }
        if self.expired {
            write!(f, "; Expires={EPOCH_HTTP_DATE}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are credentials; keep them out of logs.
        f.debug_struct("SetCookie")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("removal", &self.is_removal())
            .finish_non_exhaustive()
    }
}

/// Append every cookie as its own `Set-Cookie` header, in order.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[SetCookie]) {
    for cookie in cookies {
        match cookie.to_header_value() {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(err) => error!("Failed to encode Set-Cookie for {}: {err}", cookie.name()),
        }
    }
}
