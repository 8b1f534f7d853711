use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_KEY: &str = "provider-key";
pub const ARG_PROVIDER_TIMEOUT: &str = "provider-timeout";

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub key: SecretString,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the URL or key is missing, or the URL is not http(s).
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = matches
            .get_one::<String>(ARG_PROVIDER_URL)
            .cloned()
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("missing required argument: --{ARG_PROVIDER_URL}"))?;

        let parsed = Url::parse(&url).with_context(|| format!("invalid --{ARG_PROVIDER_URL}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("--{ARG_PROVIDER_URL} must use http or https: {url}");
        }

        let key = matches
            .get_one::<String>(ARG_PROVIDER_KEY)
            .cloned()
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("missing required argument: --{ARG_PROVIDER_KEY}"))?;

        let timeout_seconds = matches
            .get_one::<u64>(ARG_PROVIDER_TIMEOUT)
            .copied()
            .unwrap_or(5);

        Ok(Self {
            url,
            key: SecretString::from(key),
            timeout_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider base URL")
                .long_help(
                    "Identity provider base URL. Sign-in, session lookup and sign-out are sent to `auth/v1/*` below it.",
                )
                .env("STAGECALL_PROVIDER_URL"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_KEY)
                .long(ARG_PROVIDER_KEY)
                .help("Public client key sent to the identity provider as `apikey`")
                .env("STAGECALL_PROVIDER_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT)
                .long(ARG_PROVIDER_TIMEOUT)
                .help("Identity provider request timeout in seconds, also bounds sign-out")
                .env("STAGECALL_PROVIDER_TIMEOUT")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
