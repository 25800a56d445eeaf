use std::{fmt, sync::Arc};

use crate::{
    client::{CiControlPlane, ComputeProvider},
    metrics::{MetricsHandle, noop_metrics},
    pending::PendingNames,
};

/// Shared dependencies handed to the provisioner, the garbage collector,
/// the reconciler and the event dispatcher.
///
/// Clients are held as trait objects so tests can substitute fakes.
#[derive(Clone)]
pub struct Context {
    org: Arc<str>,
    ci: Arc<dyn CiControlPlane>,
    compute: Arc<dyn ComputeProvider>,
    metrics: MetricsHandle,
    pending: Arc<PendingNames>,
}

impl Context {
    /// Create a context for `org` with a no-op metrics backend.
    pub fn new(
        org: impl Into<Arc<str>>,
        ci: Arc<dyn CiControlPlane>,
        compute: Arc<dyn ComputeProvider>,
    ) -> Self {
        Self {
            org: org.into(),
            ci,
            compute,
            metrics: noop_metrics(),
            pending: Arc::new(PendingNames::new()),
        }
    }

    /// Organization every CI call is scoped to.
    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn ci(&self) -> &Arc<dyn CiControlPlane> {
        &self.ci
    }

    pub fn compute(&self) -> &Arc<dyn ComputeProvider> {
        &self.compute
    }

    /// Get a clonable handle to the metrics backend.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Names being provisioned, shared by every clone of this context.
    pub fn pending(&self) -> &Arc<PendingNames> {
        &self.pending
    }

    /// Replace the metrics backend and return updated context.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("org", &self.org)
            .field("ci", &"<client>")
            .field("compute", &"<client>")
            .field("metrics", &"<handle>")
            .field("pending", &self.pending.in_flight())
            .finish()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context(org={})", self.org)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Context;
    use crate::testing::{FakeCi, FakeCompute};

    fn ctx() -> Context {
        Context::new("acme", Arc::new(FakeCi::default()), Arc::new(FakeCompute::default()))
    }

    #[test]
    fn display_includes_org() {
        assert_eq!(ctx().to_string(), "Context(org=acme)");
    }

    #[test]
    fn with_metrics_replaces_backend() {
        let ctx = ctx().with_metrics(crate::metrics::noop_metrics());

        ctx.metrics().record_tick("completed", 10);
        assert_eq!(ctx.org(), "acme");
    }

    #[test]
    fn debug_hides_clients() {
        let out = format!("{:?}", ctx());
        assert!(out.contains("acme"));
        assert!(out.contains("<client>"));
    }
}
