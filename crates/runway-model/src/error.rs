use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate pool label: {0}")]
    DuplicatePool(String),

    #[error("invalid pool '{label}': {reason}")]
    InvalidPool { label: String, reason: String },

    #[error("malformed event payload: {0}")]
    MalformedEvent(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
