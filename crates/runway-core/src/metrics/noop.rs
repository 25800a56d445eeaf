use crate::metrics::backend::{DeletionKind, MetricsBackend, ProvisionOutcome};

/// No-op metrics backend that compiles to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_provision(&self, _: &str, _: ProvisionOutcome, _: u64) {}

    #[inline(always)]
    fn record_pool_inventory(&self, _: &str, _: usize, _: usize) {}

    #[inline(always)]
    fn record_deletion(&self, _: DeletionKind, _: bool) {}

    #[inline(always)]
    fn record_tick(&self, _: &str, _: u64) {}

    #[inline(always)]
    fn record_event(&self, _: &str, _: &str) {}
}
