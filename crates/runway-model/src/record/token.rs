use std::fmt;

use crate::RunnerName;

/// Parameters for a single-use runner registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub name: RunnerName,
    pub runner_group_id: u64,
    pub labels: Vec<String>,
}

/// Opaque, single-use credential the runner inside the instance registers with.
///
/// `runner_id` is the CI-side registration the token reserved, when the control
/// plane pre-creates one. It is what gets revoked if instance creation fails.
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationToken {
    encoded: String,
    runner_id: Option<u64>,
}

impl RegistrationToken {
    pub fn new(encoded: impl Into<String>, runner_id: Option<u64>) -> Self {
        Self {
            encoded: encoded.into(),
            runner_id,
        }
    }

    /// The secret value substituted into the bootstrap script.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.encoded
    }

    #[inline]
    pub fn runner_id(&self) -> Option<u64> {
        self.runner_id
    }
}

impl fmt::Debug for RegistrationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationToken")
            .field("encoded", &"<redacted>")
            .field("runner_id", &self.runner_id)
            .finish()
    }
}
