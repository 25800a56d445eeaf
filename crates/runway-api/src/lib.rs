//! HTTP surface of the autoscaler.
//!
//! Routes:
//! - `POST /webhook` - inbound CI job events
//! - `GET /healthz` - liveness
//! - `GET /metrics` - metrics exposition, when an exporter is attached
mod adapter;
mod error;
mod handler;
mod http;

pub use adapter::DispatcherAdapter;
pub use error::ApiError;
pub use handler::{EventHandler, MetricsExporter};
pub use http::{EVENT_HEADER, HttpApi};
