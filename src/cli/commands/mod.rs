pub mod cookie;
pub mod logging;
pub mod provider;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("stagecall")
        .about("Session gate and sign-in flows for live production workspaces")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("STAGECALL_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = provider::with_args(command);
    let command = cookie::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::SameSite;

    const REQUIRED_ENV: [(&str, Option<&str>); 3] = [
        ("STAGECALL_PROVIDER_URL", None),
        ("STAGECALL_PROVIDER_KEY", None),
        ("STAGECALL_PUBLIC_URL", None),
    ];

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "stagecall");
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        temp_env::with_vars(REQUIRED_ENV, || {
            let matches = new().get_matches_from(vec![
                "stagecall",
                "--port",
                "9090",
                "--provider-url",
                "https://idp.example.com",
                "--provider-key",
                "public-anon-key",
                "--public-url",
                "https://stagecall.dev",
                "--cookie-same-site",
                "strict",
            ]);

            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9090));

            let provider = provider::Options::parse(&matches).unwrap();
            assert_eq!(provider.url, "https://idp.example.com");
            assert_eq!(provider.timeout_seconds, 5);

            let cookie = cookie::Options::parse(&matches).unwrap();
            assert_eq!(cookie.public_url, "https://stagecall.dev");
            assert_eq!(cookie.name, "stagecall_session");
            assert_eq!(cookie.max_age_seconds, 604_800);
            assert_eq!(cookie.same_site, SameSite::Strict);
            assert_eq!(cookie.provider_prefix, "idp-");
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("STAGECALL_PORT", Some("443")),
                ("STAGECALL_PROVIDER_URL", Some("http://localhost:54321")),
                ("STAGECALL_PROVIDER_KEY", Some("public-anon-key")),
                ("STAGECALL_PROVIDER_TIMEOUT", Some("2")),
                ("STAGECALL_PUBLIC_URL", Some("http://localhost:8080")),
                ("STAGECALL_COOKIE_NAME", Some("sc")),
                ("STAGECALL_COOKIE_MAX_AGE", Some("3600")),
                ("STAGECALL_PROVIDER_COOKIE_PREFIX", Some("sb-")),
                ("STAGECALL_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["stagecall"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );

                let provider = provider::Options::parse(&matches).unwrap();
                assert_eq!(provider.timeout_seconds, 2);

                let cookie = cookie::Options::parse(&matches).unwrap();
                assert_eq!(cookie.name, "sc");
                assert_eq!(cookie.max_age_seconds, 3600);
                assert_eq!(cookie.provider_prefix, "sb-");
                assert_eq!(cookie.same_site, SameSite::Lax);
            },
        );
    }

    #[test]
    fn test_log_levels_from_env() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("STAGECALL_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["stagecall"]);
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }

    #[test]
    fn test_verbose_flags() {
        temp_env::with_vars([("STAGECALL_LOG_LEVEL", None::<&str>)], || {
            let matches = new().get_matches_from(vec!["stagecall", "-vvv"]);
            assert_eq!(
                matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                Some(3)
            );
        });
    }

    #[test]
    fn test_missing_provider_url_is_reported() {
        temp_env::with_vars(REQUIRED_ENV, || {
            let matches = new().get_matches_from(vec!["stagecall"]);
            let err = provider::Options::parse(&matches).unwrap_err();
            assert!(
                err.to_string()
                    .contains("missing required argument: --provider-url")
            );
        });
    }

    #[test]
    fn test_non_http_provider_url_is_rejected() {
        temp_env::with_vars(REQUIRED_ENV, || {
            let matches = new().get_matches_from(vec![
                "stagecall",
                "--provider-url",
                "ftp://idp.example.com",
                "--provider-key",
                "k",
            ]);
            assert!(provider::Options::parse(&matches).is_err());
        });
    }

    #[test]
    fn test_invalid_same_site_is_rejected_by_clap() {
        let result = new().try_get_matches_from(vec!["stagecall", "--cookie-same-site", "none"]);
        assert!(result.is_err());
    }
}
