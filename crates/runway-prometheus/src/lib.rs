//! Prometheus metrics backend for the runway autoscaler.
//!
//! This crate provides a [`PrometheusMetrics`] implementation of [`runway_core::MetricsBackend`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use runway_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: runway_core::MetricsHandle = Arc::new(metrics.clone());
//! # let _ = handle;
//!
//! let body = metrics.encode()?;
//! assert!(body.is_empty() || body.contains("runway_"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//! - `runway_provision_total{pool, outcome}` - Counter
//! - `runway_provision_duration_seconds{pool}` - Histogram
//! - `runway_pool_runners{pool, state}` - Gauge
//! - `runway_deletions_total{kind, result}` - Counter
//! - `runway_ticks_total{outcome}` - Counter
//! - `runway_tick_duration_seconds` - Histogram
//! - `runway_events_total{action, verdict}` - Counter
//!
//! ## HTTP Server
//! This crate does NOT serve `/metrics` itself; `runway-api` mounts [`PrometheusMetrics::encode`].

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
