use async_trait::async_trait;
use runway_core::dispatch::Dispatch;
use runway_model::JobEvent;

use crate::error::ApiError;

/// Job event handler behind `POST /webhook`.
///
/// This trait abstracts the backend implementation, allowing users to:
/// - Use the provided [`crate::DispatcherAdapter`]
/// - Wrap it with additional logic (signature checks, rate limiting, etc.)
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Route one parsed `workflow_job` event and return the verdict.
    ///
    /// Must return promptly; long-running work belongs on background tasks.
    async fn handle_job(&self, event: JobEvent) -> Result<Dispatch, ApiError>;
}

/// Source of the `/metrics` body.
pub trait MetricsExporter: Send + Sync + 'static {
    fn content_type(&self) -> &'static str;
    fn render(&self) -> Result<String, ApiError>;
}
