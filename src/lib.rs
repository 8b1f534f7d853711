//! # Stagecall (session gate for production workspaces)
//!
//! `stagecall` fronts the production workspace (projects, files, practice
//! sessions, tasks, schedules) with cookie-based sessions issued by an external
//! identity provider.
//!
//! ## Credential Store
//!
//! A single `HttpOnly` cookie holds the provider's access token. Only the
//! session synchronizer writes it; the route gate reads it and deletes it when
//! it is malformed. Cookies under the provider-reserved prefix are stale by
//! definition and are purged on every reconciliation.
//!
//! ## Route Gate
//!
//! Every request outside the public allow-list must carry a structurally valid
//! token (three non-empty dot-separated segments). Requests without one are
//! redirected to `/login?from=<path>`. The gate performs no signature or expiry
//! check; the provider remains the authority when a page needs the live session.
//!
//! ## Sign-in and sign-out
//!
//! The credential is written in the same response that redirects after
//! sign-in, so the next gated request always observes it. Sign-out is
//! best-effort: local state is always cleared and the user always lands on the
//! login page, even when the provider cannot be reached.

pub mod api;
pub mod auth;
pub mod cli;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
