use std::sync::Arc;

/// Provisioning attempt outcome for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Instance reported active.
    Success,
    /// Registration token could not be obtained; nothing was created.
    TokenFailed,
    /// Provider rejected the instance or reported it failed.
    CreateFailed,
    /// Provider did not report the instance active within the deadline.
    Timeout,
}

impl ProvisionOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ProvisionOutcome::Success => "success",
            ProvisionOutcome::TokenFailed => "token_failed",
            ProvisionOutcome::CreateFailed => "create_failed",
            ProvisionOutcome::Timeout => "timeout",
        }
    }
}

/// Which side of the join an orphan deletion targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionKind {
    Instance,
    Runner,
}

impl DeletionKind {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            DeletionKind::Instance => "instance",
            DeletionKind::Runner => "runner",
        }
    }
}

/// Backend metrics collection interface.
///
/// Implementations are injected via [`crate::Context`] and shared by the reconciler,
/// the provisioner, the garbage collector and the event dispatcher.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record one finished provisioning attempt for `pool`.
    fn record_provision(&self, pool: &str, outcome: ProvisionOutcome, duration_ms: u64);

    /// Record the idle/busy runner counts observed for `pool` during a tick.
    fn record_pool_inventory(&self, pool: &str, idle: usize, busy: usize);

    /// Record a deletion attempt made by the garbage collector or a completion event.
    fn record_deletion(&self, kind: DeletionKind, ok: bool);

    /// Record a reconcile tick.
    ///
    /// `outcome` is `"completed"` or `"skipped"`.
    fn record_tick(&self, outcome: &str, duration_ms: u64);

    /// Record the verdict for an inbound job event.
    fn record_event(&self, action: &str, verdict: &str);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
