use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// Network failures, timeouts and server-side errors; worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout(_) => true,
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ClientError::Transport("reset".into()).is_transient());
        assert!(ClientError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(
            ClientError::Api {
                status: 502,
                message: "bad gateway".into()
            }
            .is_transient()
        );
        assert!(
            !ClientError::Api {
                status: 422,
                message: "name taken".into()
            }
            .is_transient()
        );
        assert!(!ClientError::Auth("bad token".into()).is_transient());
    }
}
