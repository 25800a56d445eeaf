use std::sync::Arc;

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder, proto::MetricFamily,
};

use runway_core::{DeletionKind, MetricsBackend, ProvisionOutcome};

const NAMESPACE: &str = "runway";

/// Prometheus metrics backend for runway.
///
/// Implements [`MetricsBackend`] and exposes metrics that can be scraped via HTTP endpoint.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `pool`: one value per configured pool label
/// - `outcome`: provisioning outcomes, or `"completed"` / `"skipped"` for ticks
/// - `kind`: `"instance"`, `"runner"`
/// - `verdict`: dispatch outcomes (`"provisioning"`, `"deleting"`, `"ignored"`)
#[derive(Clone)]
pub struct PrometheusMetrics {
    provisions: IntCounterVec,
    provision_duration: HistogramVec,
    pool_runners: IntGaugeVec,
    deletions: IntCounterVec,
    ticks: IntCounterVec,
    tick_duration: Histogram,
    events: IntCounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let provisions = IntCounterVec::new(
            Opts::new("provision_total", "Provisioning attempts by pool and outcome")
                .namespace(NAMESPACE),
            &["pool", "outcome"],
        )?;
        registry.register(Box::new(provisions.clone()))?;

        let provision_duration = HistogramVec::new(
            HistogramOpts::new(
                "provision_duration_seconds",
                "Time from token request to an active instance",
            )
            .namespace(NAMESPACE)
            .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 180.0, 300.0, 600.0]),
            &["pool"],
        )?;
        registry.register(Box::new(provision_duration.clone()))?;

        let pool_runners = IntGaugeVec::new(
            Opts::new("pool_runners", "Managed runners observed per pool during the last tick")
                .namespace(NAMESPACE),
            &["pool", "state"],
        )?;
        registry.register(Box::new(pool_runners.clone()))?;

        let deletions = IntCounterVec::new(
            Opts::new("deletions_total", "Deletion attempts for instances and runners")
                .namespace(NAMESPACE),
            &["kind", "result"],
        )?;
        registry.register(Box::new(deletions.clone()))?;

        let ticks = IntCounterVec::new(
            Opts::new("ticks_total", "Reconcile ticks by outcome").namespace(NAMESPACE),
            &["outcome"],
        )?;
        registry.register(Box::new(ticks.clone()))?;

        let tick_duration = Histogram::with_opts(
            HistogramOpts::new("tick_duration_seconds", "Reconcile tick duration in seconds")
                .namespace(NAMESPACE)
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0]),
        )?;
        registry.register(Box::new(tick_duration.clone()))?;

        let events = IntCounterVec::new(
            Opts::new("events_total", "Inbound job events by action and verdict")
                .namespace(NAMESPACE),
            &["action", "verdict"],
        )?;
        registry.register(Box::new(events.clone()))?;

        Ok(Self {
            provisions,
            provision_duration,
            pool_runners,
            deletions,
            ticks,
            tick_duration,
            events,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }

    /// Content type matching [`PrometheusMetrics::encode`].
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Underlying registry, for registering process metrics alongside ours.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_provision(&self, pool: &str, outcome: ProvisionOutcome, duration_ms: u64) {
        self.provisions
            .with_label_values(&[pool, outcome.as_label()])
            .inc();

        self.provision_duration
            .with_label_values(&[pool])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_pool_inventory(&self, pool: &str, idle: usize, busy: usize) {
        self.pool_runners
            .with_label_values(&[pool, "idle"])
            .set(idle as i64);
        self.pool_runners
            .with_label_values(&[pool, "busy"])
            .set(busy as i64);
    }

    fn record_deletion(&self, kind: DeletionKind, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        self.deletions
            .with_label_values(&[kind.as_label(), result])
            .inc();
    }

    fn record_tick(&self, outcome: &str, duration_ms: u64) {
        self.ticks.with_label_values(&[outcome]).inc();
        if outcome != "skipped" {
            self.tick_duration.observe(duration_ms as f64 / 1000.0);
        }
    }

    fn record_event(&self, action: &str, verdict: &str) {
        self.events.with_label_values(&[action, verdict]).inc();
    }
}
