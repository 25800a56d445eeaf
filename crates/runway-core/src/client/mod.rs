//! Interfaces to the two independently owned external systems.
//!
//! The core never talks HTTP itself: concrete adapters (GitHub, OpenStack, in-memory fakes)
//! implement these traits and are injected through [`crate::Context`].
mod error;
pub use error::{ClientError, ClientResult};

mod request;
pub use request::CreateInstanceRequest;

use std::time::Duration;

use async_trait::async_trait;
use runway_model::{InstanceRecord, RegistrationRequest, RegistrationToken, RunnerRecord};

/// CI control plane: owner of the runner registry.
#[async_trait]
pub trait CiControlPlane: Send + Sync + 'static {
    /// List every runner registered under `org`.
    async fn list_runners(&self, org: &str) -> ClientResult<Vec<RunnerRecord>>;

    /// Exchange a runner identity for a single-use registration token.
    async fn generate_registration_token(
        &self,
        org: &str,
        req: &RegistrationRequest,
    ) -> ClientResult<RegistrationToken>;

    /// Remove a runner registration.
    async fn delete_runner(&self, org: &str, runner_id: u64) -> ClientResult<()>;
}

/// Compute provider: owner of the instance inventory.
#[async_trait]
pub trait ComputeProvider: Send + Sync + 'static {
    /// Create an instance and wait up to `timeout` for it to become active.
    ///
    /// Returns [`ClientError::Timeout`] if the deadline passes first; the instance may
    /// or may not exist in that case.
    async fn create_instance(
        &self,
        req: &CreateInstanceRequest,
        timeout: Duration,
    ) -> ClientResult<InstanceRecord>;

    /// List every instance carrying the reserved name prefix.
    async fn list_instances(&self) -> ClientResult<Vec<InstanceRecord>>;

    /// Delete an instance by id or name. Deleting a missing instance is not an error.
    async fn delete_instance(&self, name_or_id: &str) -> ClientResult<()>;
}
