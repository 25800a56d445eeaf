//! Snapshots of resources owned by the two external systems.
//!
//! Records are point-in-time reads; nothing here is cached or persisted.
mod instance;
pub use instance::{InstanceRecord, InstanceStatus};

mod runner;
pub use runner::{RunnerRecord, RunnerStatus};

mod token;
pub use token::{RegistrationRequest, RegistrationToken};
