//! Session handling for the workspace.
//!
//! Flow Overview:
//! 1) Every request passes the route gate (`gate`), which only reads the
//!    credential cookie and checks its shape.
//! 2) The login page reconciles the provider's live session with the cookie
//!    (`sync`) and either redirects or shows the form (`login`).
//! 3) Sign-in writes the cookie in the redirect response; sign-out (`logout`)
//!    clears local state first and contacts the provider last.
//!
//! Security boundaries: the gate performs structural validation only. Pages
//! that need the live session must ask the provider.

pub mod config;
pub mod cookies;
pub mod error;
pub mod gate;
pub mod login;
pub mod logout;
pub mod state;
pub mod sync;
pub mod token;

pub use config::AuthConfig;
pub use cookies::{CookieJar, SameSite, SetCookie};
pub use error::AuthError;
pub use gate::{GateDecision, route_gate};
pub use login::{LoginFlow, LoginOutcome, LoginState, Notice};
pub use logout::LogoutReport;
pub use state::AuthState;
pub use sync::{Reconciled, Reconciliation, SessionSync};
pub use token::{AuthenticatedUser, SessionToken};
