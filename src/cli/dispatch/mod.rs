//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action to run, here always the server
//! with its session and identity provider configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, cookie, provider};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let provider_opts = provider::Options::parse(matches)?;
    let cookie_opts = cookie::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        provider_url: provider_opts.url,
        provider_key: provider_opts.key,
        provider_timeout_seconds: provider_opts.timeout_seconds,
        public_url: cookie_opts.public_url,
        cookie_name: cookie_opts.name,
        cookie_max_age_seconds: cookie_opts.max_age_seconds,
        cookie_same_site: cookie_opts.same_site,
        provider_cookie_prefix: cookie_opts.provider_prefix,
    }))
}
