//! Reconciles the two inventories by shared name and deletes what has no partner.
//!
//! Both inventories are read before anything is deleted. Only names carrying the
//! reserved prefix are considered; everything else is left alone.
//!
//! Instance pass, for each managed instance:
//! - `Deleting`: skipped, already on its way out;
//! - `Error`: deleted;
//! - no runner with the same name, and older than the grace period: deleted.
//!
//! Runner pass, for each managed runner:
//! - no `Build`/`Active` instance with the same name: deleted.
//!
//! The grace period covers the window between an instance being created and its
//! runner registering. An instance with no reported creation time gets none.
//!
//! The opposite window, a registration listed before its instance, is covered by
//! the context's [`PendingNames`](crate::PendingNames): names being provisioned, or
//! settled while the pass was listing, are exempt from both passes except for
//! `Error` instances.
use std::{collections::HashSet, time::Duration};

use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::{Context, client::ClientError, metrics::DeletionKind};
use runway_model::{InstanceRecord, InstanceStatus, RunnerRecord};

/// Default age below which an unmatched instance is spared.
pub const DEFAULT_INSTANCE_GRACE: Duration = Duration::from_secs(300);

/// What a single pass deleted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Names of deleted instances.
    pub instances_deleted: Vec<String>,
    /// Names of deleted runner registrations.
    pub runners_deleted: Vec<String>,
    /// Deletions attempted but rejected by the owning system.
    pub failures: usize,
}

impl GcReport {
    pub fn is_clean(&self) -> bool {
        self.instances_deleted.is_empty() && self.runners_deleted.is_empty() && self.failures == 0
    }
}

/// Deletions decided from one snapshot of both inventories.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct GcPlan<'a> {
    pub instances: Vec<&'a InstanceRecord>,
    pub runners: Vec<&'a RunnerRecord>,
}

/// Decide what to delete. Pure: no I/O.
pub fn plan<'a>(
    instances: &'a [InstanceRecord],
    runners: &'a [RunnerRecord],
    spared: &HashSet<String>,
    grace: Duration,
    now: OffsetDateTime,
) -> GcPlan<'a> {
    let runner_names: HashSet<&str> = runners
        .iter()
        .filter(|r| r.is_managed())
        .map(|r| r.name.as_str())
        .collect();
    let live_instance_names: HashSet<&str> = instances
        .iter()
        .filter(|i| i.is_managed() && i.status.is_live())
        .map(|i| i.name.as_str())
        .collect();

    let instances = instances
        .iter()
        .filter(|i| i.is_managed())
        .filter(|i| match i.status {
            InstanceStatus::Deleting => false,
            InstanceStatus::Error => true,
            _ => {
                !runner_names.contains(i.name.as_str())
                    && !spared.contains(&i.name)
                    && i.age(now).is_none_or(|age| age >= grace)
            }
        })
        .collect();

    let runners = runners
        .iter()
        .filter(|r| r.is_managed() && !live_instance_names.contains(r.name.as_str()))
        .filter(|r| !spared.contains(&r.name))
        .collect();

    GcPlan { instances, runners }
}

/// Orphan garbage collector.
pub struct OrphanGc {
    ctx: Context,
    grace: Duration,
}

impl OrphanGc {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            grace: DEFAULT_INSTANCE_GRACE,
        }
    }

    /// Override the instance grace period.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Run one pass.
    ///
    /// Fails only when either inventory cannot be listed; in that case nothing is deleted.
    /// Individual deletion failures are logged and counted in [`GcReport::failures`].
    #[instrument(name = "gc", skip(self), fields(org = %self.ctx.org()))]
    pub async fn collect(&self) -> Result<GcReport, ClientError> {
        let pending = self.ctx.pending();
        pending.mark();
        let (instances, runners) = tokio::try_join!(
            self.ctx.compute().list_instances(),
            self.ctx.ci().list_runners(self.ctx.org()),
        )?;
        debug!(
            instances = instances.len(),
            runners = runners.len(),
            "inventories listed"
        );

        let spared = pending.spared();
        if !spared.is_empty() {
            debug!(spared = spared.len(), "names being provisioned are exempt");
        }
        let plan = plan(
            &instances,
            &runners,
            &spared,
            self.grace,
            OffsetDateTime::now_utc(),
        );
        let mut report = GcReport::default();

        for instance in plan.instances {
            let res = self.ctx.compute().delete_instance(&instance.id).await;
            self.ctx
                .metrics()
                .record_deletion(DeletionKind::Instance, res.is_ok());
            match res {
                Ok(()) => {
                    info!(instance = %instance.name, status = %instance.status, "deleted orphan instance");
                    report.instances_deleted.push(instance.name.clone());
                }
                Err(e) => {
                    warn!(instance = %instance.name, error = %e, "failed to delete orphan instance");
                    report.failures += 1;
                }
            }
        }

        for runner in plan.runners {
            let res = self.ctx.ci().delete_runner(self.ctx.org(), runner.id).await;
            self.ctx
                .metrics()
                .record_deletion(DeletionKind::Runner, res.is_ok());
            match res {
                Ok(()) => {
                    info!(runner = %runner.name, runner_id = runner.id, "deleted orphan runner");
                    report.runners_deleted.push(runner.name.clone());
                }
                Err(e) => {
                    warn!(runner = %runner.name, error = %e, "failed to delete orphan runner");
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{FakeCi, FakeCompute, Gate, instance, runner};

    fn gc(ci: &Arc<FakeCi>, compute: &Arc<FakeCompute>) -> OrphanGc {
        OrphanGc::new(Context::new("acme", ci.clone(), compute.clone()))
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[tokio::test]
    async fn deletes_unpaired_on_both_sides() {
        let compute = Arc::new(FakeCompute::with_instances(vec![
            instance("gha-aaaa", InstanceStatus::Active),
            instance("gha-bbbb", InstanceStatus::Active),
            instance("gha-cccc", InstanceStatus::Build),
        ]));
        let ci = Arc::new(FakeCi::with_runners(vec![
            runner(2, "gha-bbbb", "small", false),
            runner(3, "gha-cccc", "small", true),
            runner(4, "gha-dddd", "small", false),
        ]));

        let report = gc(&ci, &compute).collect().await.unwrap();

        assert_eq!(report.instances_deleted, vec!["gha-aaaa".to_string()]);
        assert_eq!(report.runners_deleted, vec!["gha-dddd".to_string()]);
        assert_eq!(report.failures, 0);
        assert_eq!(compute.state().deleted, vec!["id-gha-aaaa".to_string()]);
        assert_eq!(ci.state().deleted, vec![4]);
    }

    #[tokio::test]
    async fn second_pass_is_a_no_op() {
        let compute = Arc::new(FakeCompute::with_instances(vec![
            instance("gha-aaaa", InstanceStatus::Active),
            instance("gha-bbbb", InstanceStatus::Active),
        ]));
        let ci = Arc::new(FakeCi::with_runners(vec![
            runner(2, "gha-bbbb", "small", false),
            runner(4, "gha-dddd", "small", false),
        ]));
        let gc = gc(&ci, &compute);

        let first = gc.collect().await.unwrap();
        let second = gc.collect().await.unwrap();

        assert!(!first.is_clean());
        assert!(second.is_clean());
    }

    #[tokio::test]
    async fn unmanaged_resources_are_left_alone() {
        let compute = Arc::new(FakeCompute::with_instances(vec![
            instance("db-primary", InstanceStatus::Active),
            instance("gha-", InstanceStatus::Error),
        ]));
        let ci = Arc::new(FakeCi::with_runners(vec![runner(
            9,
            "static-builder",
            "small",
            false,
        )]));

        let report = gc(&ci, &compute).collect().await.unwrap();

        assert!(report.is_clean());
        assert!(compute.state().deleted.is_empty());
        assert!(ci.state().deleted.is_empty());
    }

    #[tokio::test]
    async fn error_instance_is_deleted_and_its_runner_follows() {
        let compute = Arc::new(FakeCompute::with_instances(vec![instance(
            "gha-eeee",
            InstanceStatus::Error,
        )]));
        let ci = Arc::new(FakeCi::with_runners(vec![runner(5, "gha-eeee", "small", false)]));

        let report = gc(&ci, &compute).collect().await.unwrap();

        assert_eq!(report.instances_deleted, vec!["gha-eeee".to_string()]);
        assert_eq!(report.runners_deleted, vec!["gha-eeee".to_string()]);
    }

    #[tokio::test]
    async fn deleting_instance_is_skipped_but_does_not_keep_runner() {
        let compute = Arc::new(FakeCompute::with_instances(vec![instance(
            "gha-ffff",
            InstanceStatus::Deleting,
        )]));
        let ci = Arc::new(FakeCi::with_runners(vec![runner(6, "gha-ffff", "small", false)]));

        let report = gc(&ci, &compute).collect().await.unwrap();

        assert!(report.instances_deleted.is_empty());
        assert_eq!(report.runners_deleted, vec!["gha-ffff".to_string()]);
    }

    #[tokio::test]
    async fn list_failure_deletes_nothing() {
        let compute = Arc::new(FakeCompute::with_instances(vec![instance(
            "gha-aaaa",
            InstanceStatus::Active,
        )]));
        let ci = Arc::new(FakeCi::default());
        ci.state().fail_list = true;

        let res = gc(&ci, &compute).collect().await;

        assert!(res.is_err());
        assert!(compute.state().deleted.is_empty());
    }

    #[tokio::test]
    async fn delete_failures_are_counted_not_fatal() {
        let compute = Arc::new(FakeCompute::with_instances(vec![
            instance("gha-aaaa", InstanceStatus::Active),
            instance("gha-bbbb", InstanceStatus::Error),
        ]));
        compute.state().fail_delete = true;
        let ci = Arc::new(FakeCi::with_runners(vec![runner(4, "gha-dddd", "small", false)]));

        let report = gc(&ci, &compute).collect().await.unwrap();

        assert_eq!(report.failures, 2);
        assert_eq!(sorted(report.runners_deleted), vec!["gha-dddd".to_string()]);
    }

    #[test]
    fn young_unmatched_instance_is_spared() {
        let now = OffsetDateTime::now_utc();
        let young = InstanceRecord {
            created_at: Some(now - Duration::from_secs(60)),
            ..instance("gha-young", InstanceStatus::Build)
        };
        let old = InstanceRecord {
            created_at: Some(now - Duration::from_secs(600)),
            ..instance("gha-old", InstanceStatus::Active)
        };
        let instances = vec![young, old];

        let plan = plan(&instances, &[], &HashSet::new(), DEFAULT_INSTANCE_GRACE, now);

        let names: Vec<_> = plan.instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["gha-old"]);
    }

    #[test]
    fn young_instance_still_keeps_its_runner() {
        let now = OffsetDateTime::now_utc();
        let instances = vec![InstanceRecord {
            created_at: Some(now),
            ..instance("gha-young", InstanceStatus::Build)
        }];
        let runners = vec![runner(1, "gha-young", "small", false)];

        let plan = plan(&instances, &runners, &HashSet::new(), DEFAULT_INSTANCE_GRACE, now);

        assert_eq!(plan, GcPlan::default());
    }

    #[tokio::test]
    async fn registration_of_instance_being_created_is_kept() {
        let compute = Arc::new(FakeCompute::default());
        let ci = Arc::new(FakeCi::with_runners(vec![runner(7, "gha-new", "small", false)]));
        let gc = gc(&ci, &compute);

        let guard = gc.ctx.pending().track("gha-new");
        let first = gc.collect().await.unwrap();
        assert!(first.is_clean());
        assert!(ci.state().deleted.is_empty());

        // Creation failed and left the registration behind.
        drop(guard);
        let second = gc.collect().await.unwrap();
        assert_eq!(second.runners_deleted, vec!["gha-new".to_string()]);
    }

    #[tokio::test]
    async fn registration_settled_during_listing_is_kept() {
        let gate = Gate::default();
        let compute = Arc::new(FakeCompute::default());
        let ci = Arc::new(FakeCi::with_runners(vec![runner(7, "gha-new", "small", false)]));
        ci.state().list_gate = Some(gate.clone());
        let gc = Arc::new(gc(&ci, &compute));
        let guard = gc.ctx.pending().track("gha-new");

        let pass = tokio::spawn({
            let gc = Arc::clone(&gc);
            async move { gc.collect().await }
        });
        gate.entered.notified().await;
        // The instance was listed as absent; its creation finishes before runners are read.
        drop(guard);
        gate.release.notify_one();

        assert!(pass.await.unwrap().unwrap().is_clean());
        assert!(ci.state().deleted.is_empty());
    }

    #[test]
    fn spared_names_survive_both_passes_unless_errored() {
        let now = OffsetDateTime::now_utc();
        let instances = vec![
            instance("gha-build", InstanceStatus::Build),
            instance("gha-broken", InstanceStatus::Error),
        ];
        let runners = vec![runner(1, "gha-reg", "small", false)];
        let spared: HashSet<String> = ["gha-build", "gha-broken", "gha-reg"]
            .into_iter()
            .map(String::from)
            .collect();

        let plan = plan(&instances, &runners, &spared, DEFAULT_INSTANCE_GRACE, now);

        let names: Vec<_> = plan.instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["gha-broken"]);
        assert!(plan.runners.is_empty());
    }
}
