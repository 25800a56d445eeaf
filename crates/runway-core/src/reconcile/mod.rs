//! Periodic min-ready maintenance.
//!
//! A tick walks the pools in configuration order. For each one it counts the idle
//! and busy managed runners carrying the pool label, then provisions the deficit
//! in a bounded batch and waits for the whole batch. Once every pool is done the
//! orphan collector runs once.
//!
//! Ticks are single-flight: a tick that fires while another is running is skipped,
//! never queued. [`reconcile_task`] wraps the tick as a supervised periodic task.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::{
    Context,
    client::ClientError,
    gc::{GcReport, OrphanGc},
    pool::WorkerPool,
    provision::Provisioner,
};
use runway_model::{PoolConfig, PoolRegistry};

mod task;
pub use task::{RECONCILE_TASK_NAME, reconcile_task};

/// Default delay between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    pub interval: Duration,
    /// Provisioning calls in flight per pool batch.
    pub max_workers: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_workers: crate::pool::DEFAULT_MAX_WORKERS,
        }
    }
}

/// What one pool looked like and what was done about it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub label: String,
    pub idle: usize,
    pub busy: usize,
    pub deficit: usize,
    pub provisioned: usize,
    pub failed: usize,
    /// Set when the pool could not be inspected; nothing was provisioned for it.
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct TickReport {
    pub pools: Vec<PoolReport>,
    pub gc: Result<GcReport, ClientError>,
}

impl TickReport {
    pub fn provisioned(&self) -> usize {
        self.pools.iter().map(|p| p.provisioned).sum()
    }

    pub fn failed(&self) -> usize {
        self.pools.iter().map(|p| p.failed).sum()
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    /// A previous tick was still running.
    Skipped,
    Completed(TickReport),
}

pub struct Reconciler {
    ctx: Context,
    pools: Arc<PoolRegistry>,
    provisioner: Arc<Provisioner>,
    gc: OrphanGc,
    workers: WorkerPool,
    interval: Duration,
    in_flight: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        ctx: Context,
        pools: Arc<PoolRegistry>,
        provisioner: Arc<Provisioner>,
        gc: OrphanGc,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            ctx,
            pools,
            provisioner,
            gc,
            workers: WorkerPool::new(config.max_workers),
            interval: config.interval,
            in_flight: Mutex::new(()),
        }
    }

    /// Run one tick unless another one is in progress.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("previous tick still running; skipping");
            self.ctx.metrics().record_tick("skipped", 0);
            return TickOutcome::Skipped;
        };

        let started = Instant::now();
        let report = self.reconcile().instrument(info_span!("tick")).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.ctx.metrics().record_tick("completed", elapsed_ms);

        info!(
            pools = report.pools.len(),
            provisioned = report.provisioned(),
            failed = report.failed(),
            gc_ok = report.gc.is_ok(),
            elapsed_ms,
            "tick completed"
        );
        TickOutcome::Completed(report)
    }

    /// Delay between the end of one tick and the start of the next.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    async fn reconcile(&self) -> TickReport {
        let mut pools = Vec::with_capacity(self.pools.len());
        for pool in self.pools.iter() {
            pools.push(self.reconcile_pool(pool).await);
        }

        let gc = self.gc.collect().await;
        if let Err(e) = &gc {
            warn!(error = %e, "orphan collection failed");
        }
        TickReport { pools, gc }
    }

    #[instrument(name = "pool", skip(self, pool), fields(pool = %pool.label, min_ready = pool.min_ready))]
    async fn reconcile_pool(&self, pool: &PoolConfig) -> PoolReport {
        let mut report = PoolReport {
            label: pool.label.clone(),
            ..PoolReport::default()
        };

        let runners = match self.ctx.ci().list_runners(self.ctx.org()).await {
            Ok(runners) => runners,
            Err(e) => {
                warn!(error = %e, "failed to list runners; pool skipped this tick");
                report.error = Some(e.to_string());
                return report;
            }
        };

        for runner in runners
            .iter()
            .filter(|r| r.is_managed() && r.has_label(&pool.label))
        {
            if runner.is_idle() {
                report.idle += 1;
            } else {
                report.busy += 1;
            }
        }
        self.ctx
            .metrics()
            .record_pool_inventory(&pool.label, report.idle, report.busy);

        report.deficit = (pool.min_ready as usize).saturating_sub(report.idle);
        if report.deficit == 0 {
            debug!(idle = report.idle, busy = report.busy, "pool satisfied");
            return report;
        }

        info!(
            idle = report.idle,
            busy = report.busy,
            deficit = report.deficit,
            "provisioning to close deficit"
        );
        let jobs = (0..report.deficit).map(|_| {
            let provisioner = Arc::clone(&self.provisioner);
            let pool = pool.clone();
            async move { provisioner.provision(&pool).await }
        });
        let batch = self.workers.join_all(jobs).await;

        for e in batch.errors() {
            warn!(error = %e, "provisioning task failed");
        }
        report.provisioned = batch.succeeded();
        report.failed = batch.failed();
        report
    }
}
