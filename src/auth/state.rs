use super::{config::AuthConfig, sync::SessionSync};
use crate::provider::IdentityProvider;
use std::{fmt, sync::Arc};

/// Shared, immutable state handed to the gate and every auth handler.
pub struct AuthState {
    config: AuthConfig,
    provider: Arc<dyn IdentityProvider>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { config, provider }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Session synchronizer bound to this configuration.
    #[must_use]
    pub fn sync(&self) -> SessionSync<'_> {
        SessionSync::new(&self.config)
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
