use crate::auth::{
    SameSite,
    config::{DEFAULT_COOKIE_NAME, DEFAULT_PROVIDER_COOKIE_PREFIX},
};
use anyhow::Context;
use clap::{Arg, ArgMatches, Command, builder::PossibleValuesParser};
use url::Url;

pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_COOKIE_NAME: &str = "cookie-name";
pub const ARG_COOKIE_MAX_AGE: &str = "cookie-max-age";
pub const ARG_COOKIE_SAME_SITE: &str = "cookie-same-site";
pub const ARG_PROVIDER_COOKIE_PREFIX: &str = "provider-cookie-prefix";

#[derive(Debug, Clone)]
pub struct Options {
    pub public_url: String,
    pub name: String,
    pub max_age_seconds: u64,
    pub same_site: SameSite,
    pub provider_prefix: String,
}

impl Options {
    /// Parse credential cookie arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the public URL is missing or invalid, or the cookie
    /// name is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let public_url = matches
            .get_one::<String>(ARG_PUBLIC_URL)
            .cloned()
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("missing required argument: --{ARG_PUBLIC_URL}"))?;
        Url::parse(&public_url).with_context(|| format!("invalid --{ARG_PUBLIC_URL}"))?;

        let name = matches
            .get_one::<String>(ARG_COOKIE_NAME)
            .cloned()
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
        if name.trim().is_empty() || name.contains(['=', ';', ' ']) {
            anyhow::bail!("invalid --{ARG_COOKIE_NAME}: {name:?}");
        }

        let same_site = matches
            .get_one::<String>(ARG_COOKIE_SAME_SITE)
            .map(|value| value.parse::<SameSite>())
            .transpose()
            .map_err(|err| anyhow::anyhow!("invalid --{ARG_COOKIE_SAME_SITE}: {err}"))?
            .unwrap_or_default();

        Ok(Self {
            public_url,
            name,
            max_age_seconds: matches
                .get_one::<u64>(ARG_COOKIE_MAX_AGE)
                .copied()
                .unwrap_or(604_800),
            same_site,
            provider_prefix: matches
                .get_one::<String>(ARG_PROVIDER_COOKIE_PREFIX)
                .cloned()
                .unwrap_or_else(|| DEFAULT_PROVIDER_COOKIE_PREFIX.to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long(ARG_PUBLIC_URL)
                .help("Public base URL of the workspace; https marks cookies Secure")
                .env("STAGECALL_PUBLIC_URL"),
        )
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Name of the credential cookie")
                .env("STAGECALL_COOKIE_NAME")
                .default_value(DEFAULT_COOKIE_NAME),
        )
        .arg(
            Arg::new(ARG_COOKIE_MAX_AGE)
                .long(ARG_COOKIE_MAX_AGE)
                .help("Credential cookie lifetime in seconds")
                .env("STAGECALL_COOKIE_MAX_AGE")
                .default_value("604800")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SAME_SITE)
                .long(ARG_COOKIE_SAME_SITE)
                .help("SameSite attribute of the credential cookie")
                .env("STAGECALL_COOKIE_SAME_SITE")
                .default_value("lax")
                .value_parser(PossibleValuesParser::new(["lax", "strict"])),
        )
        .arg(
            Arg::new(ARG_PROVIDER_COOKIE_PREFIX)
                .long(ARG_PROVIDER_COOKIE_PREFIX)
                .help("Cookie name prefix reserved by the identity provider; purged on reconcile and logout")
                .env("STAGECALL_PROVIDER_COOKIE_PREFIX")
                .default_value(DEFAULT_PROVIDER_COOKIE_PREFIX),
        )
}
