pub mod bootstrap;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod gc;
pub mod pool;
pub mod provision;
pub mod reconcile;
pub mod supervisor;

mod context;
pub use context::Context;

mod pending;
pub use pending::{PendingGuard, PendingNames};

mod metrics;
pub use metrics::{
    DeletionKind, MetricsBackend, MetricsHandle, NoOpMetrics, ProvisionOutcome, noop_metrics,
};

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    pub use crate::Context;
    pub use crate::bootstrap::BootstrapTemplate;
    pub use crate::client::{CiControlPlane, ClientError, ComputeProvider, CreateInstanceRequest};
    pub use crate::dispatch::{Dispatch, EventDispatcher, IgnoreReason};
    pub use crate::error::CoreError;
    pub use crate::gc::{GcReport, OrphanGc};
    pub use crate::pool::{BatchReport, WorkerPool};
    pub use crate::provision::{ProvisionError, Provisioner, ProvisionerConfig};
    pub use crate::reconcile::{
        Reconciler, ReconcilerConfig, TickOutcome, TickReport, reconcile_task,
    };
    pub use crate::supervisor::SupervisorHandle;
}
