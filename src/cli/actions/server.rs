use crate::{
    api,
    auth::{AuthConfig, AuthState, SameSite},
    provider::HttpIdentityProvider,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub provider_url: String,
    pub provider_key: SecretString,
    pub provider_timeout_seconds: u64,
    pub public_url: String,
    pub cookie_name: String,
    pub cookie_max_age_seconds: u64,
    pub cookie_same_site: SameSite,
    pub provider_cookie_prefix: String,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.public_url.clone())
            .with_cookie_name(self.cookie_name.clone())
            .with_cookie_max_age_seconds(self.cookie_max_age_seconds)
            .with_cookie_same_site(self.cookie_same_site)
            .with_provider_cookie_prefix(self.provider_cookie_prefix.clone())
            .with_sign_out_timeout(Duration::from_secs(self.provider_timeout_seconds))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = args.auth_config();
    let provider = HttpIdentityProvider::new(
        &args.provider_url,
        args.provider_key,
        Duration::from_secs(args.provider_timeout_seconds),
    )
    .context("Failed to build identity provider client")?;

    let auth_state = Arc::new(AuthState::new(config, Arc::new(provider)));

    api::new(args.port, auth_state).await
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        provider_url = %args.provider_url,
        public_url = %args.public_url,
        cookie_name = %args.cookie_name,
        cookie_same_site = args.cookie_same_site.as_str(),
        "Starting stagecall"
    );
}
