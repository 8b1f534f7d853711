//! Structured session tokens and the user view derived from them.
//!
//! A token is accepted when it has exactly three non-empty dot-separated
//! segments. Claims are read from the middle segment when it happens to be
//! base64url JSON; nothing here verifies a signature or an expiry.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use std::fmt;

const SEGMENT_COUNT: usize = 3;

/// Returns `true` when `value` has the three-segment structured-token shape.
#[must_use]
pub fn is_well_formed(value: &str) -> bool {
    let mut segments = 0;
    for segment in value.split('.') {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == SEGMENT_COUNT
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
struct TokenClaims {
    sub: Option<String>,
    email: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    user_metadata: Option<UserMetadata>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
struct UserMetadata {
    display_name: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
}

impl UserMetadata {
    fn display_name(&self) -> Option<String> {
        self.display_name
            .as_ref()
            .or(self.full_name.as_ref())
            .or(self.name.as_ref())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }
}

/// Bearer credential issued by the identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    raw: String,
    claims: Option<TokenClaims>,
}

impl SessionToken {
    /// Parse a raw credential. Malformed values are treated as absent.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if !is_well_formed(raw) {
            return None;
        }
        let claims = raw.split('.').nth(1).and_then(decode_claims);
        Some(Self {
            raw: raw.to_string(),
            claims,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Issuance time (unix seconds) when the payload carries `iat`.
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.claims.as_ref().and_then(|claims| claims.iat)
    }

    /// Expiry time (unix seconds) when the payload carries `exp`.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.claims.as_ref().and_then(|claims| claims.exp)
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.as_ref().and_then(|claims| claims.sub.as_deref())
    }

    /// The user this token was issued to, if the payload names one.
    #[must_use]
    pub fn user(&self) -> Option<AuthenticatedUser> {
        let claims = self.claims.as_ref()?;
        let identifier = claims.email.clone().or_else(|| claims.sub.clone())?;
        Some(AuthenticatedUser {
            identifier,
            email: claims.email.clone(),
            display_name: claims
                .user_metadata
                .as_ref()
                .and_then(UserMetadata::display_name),
        })
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("raw", &"***")
            .field("subject", &self.subject())
            .field("expires_at", &self.expires_at())
            .finish()
    }
}

fn decode_claims(segment: &str) -> Option<TokenClaims> {
    let bytes = Base64UrlUnpadded::decode_vec(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Read-only view of the signed-in user, alive only while a request holds a
/// valid session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Email when known, otherwise the provider subject.
    pub identifier: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    /// Name to greet the user with.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.identifier)
    }
}
