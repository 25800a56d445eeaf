use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::debug;

use runway_core::dispatch::{Dispatch, IgnoreReason};
use runway_model::JobEvent;

use crate::{
    error::ApiError,
    handler::{EventHandler, MetricsExporter},
};

/// Header carrying the webhook event type.
pub const EVENT_HEADER: &str = "x-github-event";

const WORKFLOW_JOB: &str = "workflow_job";

/// HTTP API service builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
    metrics: Option<Arc<dyn MetricsExporter>>,
}

struct AppState<H> {
    handler: Arc<H>,
    metrics: Option<Arc<dyn MetricsExporter>>,
}

impl<H> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            metrics: self.metrics.clone(),
        }
    }
}

impl<H> HttpApi<H>
where
    H: EventHandler,
{
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            metrics: None,
        }
    }

    /// Serve `exporter` on `GET /metrics`. Without one the route answers `404`.
    pub fn with_metrics(mut self, exporter: Arc<dyn MetricsExporter>) -> Self {
        self.metrics = Some(exporter);
        self
    }

    /// Build axum router with mounted endpoints.
    pub fn router(self) -> Router {
        Router::new()
            .route("/webhook", post(webhook::<H>))
            .route("/healthz", get(healthz))
            .route("/metrics", get(metrics::<H>))
            .with_state(AppState {
                handler: self.handler,
                metrics: self.metrics,
            })
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// POST /webhook
///
/// `ping` and every event other than `workflow_job` are acknowledged with `200`.
/// Job events are answered `202` once routed; the work they trigger runs in the background.
async fn webhook<H>(
    State(state): State<AppState<H>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError>
where
    H: EventHandler,
{
    let kind = headers
        .get(EVENT_HEADER)
        .ok_or_else(|| ApiError::InvalidRequest(format!("missing {EVENT_HEADER} header")))?
        .to_str()
        .map_err(|_| ApiError::InvalidRequest(format!("{EVENT_HEADER} is not ascii")))?;

    if kind != WORKFLOW_JOB {
        debug!(event = kind, "ignoring webhook event");
        let verdict = Dispatch::ignored(IgnoreReason::UnhandledEvent);
        return Ok((StatusCode::OK, Json(verdict)).into_response());
    }

    let event = JobEvent::from_slice(&body)?;
    let verdict = state.handler.handle_job(event).await?;

    Ok((StatusCode::ACCEPTED, Json(verdict)).into_response())
}

/// GET /healthz
async fn healthz() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /metrics
async fn metrics<H>(State(state): State<AppState<H>>) -> Result<Response, ApiError>
where
    H: EventHandler,
{
    let exporter = state.metrics.as_ref().ok_or(ApiError::NotFound)?;
    let body = exporter.render()?;

    Ok(([(header::CONTENT_TYPE, exporter.content_type())], body).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use runway_core::MetricsBackend;
    use runway_model::JobAction;
    use runway_prometheus::PrometheusMetrics;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<JobEvent>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_job(&self, event: JobEvent) -> Result<Dispatch, ApiError> {
            let verdict = match event.action {
                JobAction::Queued => Dispatch::Provisioning {
                    pool: "runway-small".into(),
                },
                _ => Dispatch::ignored(IgnoreReason::UnhandledAction),
            };
            self.events.lock().unwrap().push(event);
            Ok(verdict)
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn post(base: &str, event: Option<&str>, body: String) -> reqwest::Response {
        let mut req = reqwest::Client::new()
            .post(format!("{base}/webhook"))
            .header("content-type", "application/json")
            .body(body);
        if let Some(event) = event {
            req = req.header(EVENT_HEADER, event);
        }
        req.send().await.unwrap()
    }

    fn queued_body() -> String {
        json!({
            "action": "queued",
            "organization": { "login": "acme" },
            "workflow_job": { "id": 7, "labels": ["self-hosted", "runway-small"] }
        })
        .to_string()
    }

    #[tokio::test]
    async fn workflow_job_is_accepted_with_verdict() {
        let recorder = Arc::new(Recorder::default());
        let base = serve(HttpApi::new(recorder.clone()).router()).await;

        let resp = post(&base, Some("workflow_job"), queued_body()).await;
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({ "outcome": "provisioning", "pool": "runway-small" }));

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].job_id, Some(7));
    }

    #[tokio::test]
    async fn ping_and_other_events_are_acknowledged() {
        let recorder = Arc::new(Recorder::default());
        let base = serve(HttpApi::new(recorder.clone()).router()).await;

        for kind in ["ping", "push", "workflow_run"] {
            let resp = post(&base, Some(kind), r#"{"zen": "hi"}"#.into()).await;
            assert_eq!(resp.status(), reqwest::StatusCode::OK, "{kind}");

            let body: Value = resp.json().await.unwrap();
            assert_eq!(body, json!({ "outcome": "ignored", "reason": "unhandled_event" }));
        }
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_bad_request() {
        let recorder = Arc::new(Recorder::default());
        let base = serve(HttpApi::new(recorder.clone()).router()).await;

        let resp = post(&base, Some("workflow_job"), "{not json".into()).await;
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("malformed"));
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_event_header_is_bad_request() {
        let base = serve(HttpApi::new(Arc::new(Recorder::default())).router()).await;

        let resp = post(&base, None, queued_body()).await;
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let base = serve(HttpApi::new(Arc::new(Recorder::default())).router()).await;

        let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_without_exporter_is_not_found() {
        let base = serve(HttpApi::new(Arc::new(Recorder::default())).router()).await;

        let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_serves_prometheus_text() {
        let prom = PrometheusMetrics::new().unwrap();
        prom.record_tick("completed", 250);
        let api = HttpApi::new(Arc::new(Recorder::default())).with_metrics(Arc::new(prom));
        let base = serve(api.router()).await;

        let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let ctype = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(ctype.starts_with("text/plain"));
        assert!(resp.text().await.unwrap().contains("runway_ticks_total"));
    }
}
