//! Route handlers. The auth pages delegate every decision to `crate::auth`;
//! handlers only translate outcomes into HTTP responses.

pub mod health;
pub mod login;
pub mod logout;
pub(crate) mod page;
pub mod session;
pub mod workspace;
