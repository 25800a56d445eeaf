use std::sync::Arc;

use async_trait::async_trait;
use runway_core::dispatch::{Dispatch, EventDispatcher};
use runway_model::JobEvent;
use runway_prometheus::PrometheusMetrics;

use crate::{
    error::ApiError,
    handler::{EventHandler, MetricsExporter},
};

/// Adapter that bridges [`EventDispatcher`] to [`EventHandler`].
pub struct DispatcherAdapter {
    dispatcher: Arc<EventDispatcher>,
}

impl DispatcherAdapter {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EventHandler for DispatcherAdapter {
    async fn handle_job(&self, event: JobEvent) -> Result<Dispatch, ApiError> {
        Ok(self.dispatcher.dispatch(&event))
    }
}

impl MetricsExporter for PrometheusMetrics {
    fn content_type(&self) -> &'static str {
        PrometheusMetrics::content_type(self)
    }

    fn render(&self) -> Result<String, ApiError> {
        self.encode().map_err(|e| ApiError::Internal(e.to_string()))
    }
}
