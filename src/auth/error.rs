use crate::provider::ProviderError;
use axum::http::StatusCode;
use thiserror::Error;

/// Failures a sign-in attempt can surface to the user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing information.")]
    MissingInformation,
    /// Credential rejection; the provider's message is shown verbatim.
    #[error("{0}")]
    Rejected(String),
    /// The provider accepted the credentials but returned no usable token.
    #[error("Authentication succeeded but no access token was received")]
    NoAccessToken,
    #[error("{0}")]
    Provider(ProviderError),
}

impl AuthError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingInformation => StatusCode::BAD_REQUEST,
            Self::Rejected(_) => StatusCode::UNAUTHORIZED,
            Self::NoAccessToken | Self::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { message, .. } => Self::Rejected(message),
            other => Self::Provider(other),
        }
    }
}
