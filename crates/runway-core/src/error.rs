use thiserror::Error;

use crate::{client::ClientError, provision::ProvisionError};
use runway_model::ModelError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("supervisor error: {0}")]
    Supervisor(String),
}
