use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;

use crate::{client::ClientError, metrics::ProvisionOutcome};

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No instance was created.
    #[error("registration token request failed: {0}")]
    Token(#[source] ClientError),

    #[error("failed to render bootstrap payload: {0}")]
    Bootstrap(String),

    #[error("instance '{name}' creation failed: {source}")]
    Create {
        name: String,
        #[source]
        source: ClientError,
    },

    /// The instance may or may not exist; garbage collection resolves it.
    #[error("instance '{name}' not active within {timeout:?}")]
    CreateTimeout { name: String, timeout: Duration },

    #[error("instance '{name}' entered status {status}")]
    InstanceFailed { name: String, status: String },

    #[error("provisioning task aborted: {0}")]
    Aborted(String),
}

impl ProvisionError {
    pub fn outcome(&self) -> ProvisionOutcome {
        match self {
            ProvisionError::Token(_) => ProvisionOutcome::TokenFailed,
            ProvisionError::CreateTimeout { .. } => ProvisionOutcome::Timeout,
            _ => ProvisionOutcome::CreateFailed,
        }
    }

    /// Returns `true` if no instance can exist as a result of the failed attempt.
    pub fn is_side_effect_free(&self) -> bool {
        matches!(self, ProvisionError::Token(_) | ProvisionError::Bootstrap(_))
    }
}

impl From<JoinError> for ProvisionError {
    fn from(e: JoinError) -> Self {
        ProvisionError::Aborted(e.to_string())
    }
}
