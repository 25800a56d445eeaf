//! The tick as a supervised periodic task.
//!
//! The task owns a single controller slot with drop-if-running admission. After
//! every run, successful or not, the supervisor waits one interval and restarts it.
use std::sync::Arc;

use taskvisor::{
    BackoffPolicy, ControllerAdmission, ControllerSpec, JitterPolicy, RestartPolicy, TaskError,
    TaskFn, TaskRef, TaskSpec,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Reconciler, TickOutcome};

/// Slot name of the reconcile task.
pub const RECONCILE_TASK_NAME: &str = "runway-reconcile";

/// Build the [`ControllerSpec`] that drives `reconciler` on its interval.
///
/// The first tick runs as soon as it is submitted.
pub fn reconcile_task(reconciler: Arc<Reconciler>) -> ControllerSpec {
    let interval = reconciler.interval();
    let task: TaskRef = TaskFn::arc(RECONCILE_TASK_NAME, move |ctx: CancellationToken| {
        let reconciler = Arc::clone(&reconciler);
        async move { run_tick(&reconciler, ctx).await }
    });

    let backoff = BackoffPolicy {
        success_delay: Some(interval),
        first: interval,
        max: interval,
        jitter: JitterPolicy::None,
        factor: 1.0,
    };
    ControllerSpec {
        admission: ControllerAdmission::DropIfRunning,
        task_spec: TaskSpec::new(task, RestartPolicy::Always, backoff, None),
    }
}

/// Task body: one tick, abandoned if the supervisor cancels it.
pub(crate) async fn run_tick(
    reconciler: &Reconciler,
    ctx: CancellationToken,
) -> Result<(), TaskError> {
    if ctx.is_cancelled() {
        return Err(TaskError::Canceled);
    }
    tokio::select! {
        _ = ctx.cancelled() => {
            debug!("tick abandoned on shutdown");
            Err(TaskError::Canceled)
        }
        outcome = reconciler.tick() => {
            if let TickOutcome::Skipped = outcome {
                debug!("tick skipped by the reconciler");
            }
            Ok(())
        }
    }
}
