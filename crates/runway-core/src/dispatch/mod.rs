//! Reacts to inbound job events.
//!
//! `dispatch` decides synchronously and returns a [`Dispatch`] verdict; the work it
//! triggers (one provisioning call, or one instance deletion) runs on a task tracker
//! so the caller can acknowledge the event right away.
use std::sync::Arc;

use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{Context, metrics::DeletionKind, provision::Provisioner};
use runway_model::{JobAction, JobEvent, PoolRegistry, RunnerName};

/// Decision taken for one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Dispatch {
    Ignored { reason: IgnoreReason },
    /// One provisioning call was started for `pool`.
    Provisioning { pool: String },
    /// Deletion of the instance named `runner_name` was started.
    Deleting { runner_name: String },
}

impl Dispatch {
    pub fn ignored(reason: IgnoreReason) -> Self {
        Dispatch::Ignored { reason }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Dispatch::Ignored { .. } => "ignored",
            Dispatch::Provisioning { .. } => "provisioning",
            Dispatch::Deleting { .. } => "deleting",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Event is not a workflow job event.
    UnhandledEvent,
    /// Event belongs to another organization.
    ForeignOrganization,
    /// No pool serves any of the job's labels.
    NoMatchingPool,
    /// Completed job never got a runner.
    MissingRunnerName,
    /// Completed job ran on a runner this system does not own.
    UnmanagedRunner,
    UnhandledAction,
}

pub struct EventDispatcher {
    ctx: Context,
    pools: Arc<PoolRegistry>,
    provisioner: Arc<Provisioner>,
    tracker: TaskTracker,
}

impl EventDispatcher {
    pub fn new(ctx: Context, pools: Arc<PoolRegistry>, provisioner: Arc<Provisioner>) -> Self {
        Self {
            ctx,
            pools,
            provisioner,
            tracker: TaskTracker::new(),
        }
    }

    /// Route one event. Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: &JobEvent) -> Dispatch {
        let verdict = self.route(event);
        self.ctx
            .metrics()
            .record_event(event.action.as_label(), verdict.as_label());
        debug!(action = %event.action, job_id = ?event.job_id, ?verdict, "event dispatched");
        verdict
    }

    /// Wait for all work spawned so far to finish.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Number of spawned tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    fn route(&self, event: &JobEvent) -> Dispatch {
        let same_org = event
            .organization
            .as_deref()
            .is_some_and(|org| org.eq_ignore_ascii_case(self.ctx.org()));
        if !same_org {
            return Dispatch::ignored(IgnoreReason::ForeignOrganization);
        }

        match event.action {
            JobAction::Queued => self.on_queued(event),
            JobAction::Completed => self.on_completed(event),
            _ => Dispatch::ignored(IgnoreReason::UnhandledAction),
        }
    }

    fn on_queued(&self, event: &JobEvent) -> Dispatch {
        let Some(pool) = self.pools.first_match(&event.labels) else {
            return Dispatch::ignored(IgnoreReason::NoMatchingPool);
        };

        let pool = pool.clone();
        let label = pool.label.clone();
        let provisioner = Arc::clone(&self.provisioner);
        self.tracker.spawn(
            async move {
                match provisioner.provision(&pool).await {
                    Ok(p) => info!(runner = %p.name, "runner provisioned for queued job"),
                    Err(e) => warn!(error = %e, "provisioning for queued job failed"),
                }
            }
            .instrument(info_span!("queued_job", job_id = ?event.job_id)),
        );

        Dispatch::Provisioning { pool: label }
    }

    fn on_completed(&self, event: &JobEvent) -> Dispatch {
        let Some(name) = event.runner_name.clone() else {
            return Dispatch::ignored(IgnoreReason::MissingRunnerName);
        };
        if !RunnerName::is_managed(&name) {
            return Dispatch::ignored(IgnoreReason::UnmanagedRunner);
        }

        let compute = Arc::clone(self.ctx.compute());
        let metrics = Arc::clone(self.ctx.metrics());
        let span = info_span!("completed_job", job_id = ?event.job_id, runner = %name);
        let runner_name = name.clone();
        self.tracker.spawn(
            async move {
                let res = compute.delete_instance(&name).await;
                metrics.record_deletion(DeletionKind::Instance, res.is_ok());
                match res {
                    Ok(()) => info!("instance deleted after job completion"),
                    Err(e) => warn!(error = %e, "failed to delete instance; left for garbage collection"),
                }
            }
            .instrument(span),
        );

        Dispatch::Deleting { runner_name }
    }
}
