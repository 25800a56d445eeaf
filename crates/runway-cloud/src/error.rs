use thiserror::Error;

/// Failure to construct an adapter. Request-time failures are [`runway_core::client::ClientError`].
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("invalid credential: {0}")]
    InvalidCredential(&'static str),

    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}
