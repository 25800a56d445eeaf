#![cfg(feature = "subscriber")]

//! Logs supervisor events for the background tasks.
//!
//! Routine scheduling lands at debug or trace; failures and shutdown trouble at warn
//! or error.
use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

const QUEUE_CAPACITY: usize = 1024;

/// Supervisor event subscriber writing through `tracing`.
#[derive(Debug, Default)]
pub struct TaskEventLogger;

#[async_trait]
impl Subscribe for TaskEventLogger {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "runway-task-log"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("-");
    let reason = e.reason.as_deref().unwrap_or("");

    match e.kind {
        EventKind::TaskStarting => debug!(task, attempt = e.attempt, "task starting"),
        EventKind::TaskStopped => trace!(task, "task stopped"),
        EventKind::TaskFailed => warn!(task, attempt = e.attempt, reason, "task failed"),
        EventKind::TimeoutHit => warn!(task, timeout_ms = e.timeout_ms, "task timed out"),
        EventKind::BackoffScheduled => {
            trace!(task, delay_ms = e.delay_ms, "next run scheduled")
        }
        EventKind::ControllerRejected => {
            debug!(task, reason, "submission dropped; slot busy")
        }
        EventKind::ActorExhausted => warn!(task, reason, "task will not restart"),
        EventKind::ActorDead => error!(task, reason, "task terminated permanently"),
        EventKind::ShutdownRequested => info!("supervisor shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("background tasks stopped"),
        EventKind::GraceExceeded => warn!("background tasks outlived the shutdown grace"),
        EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
            error!(task, reason, "event subscriber degraded")
        }
        _ => trace!(task, reason, "supervisor event"),
    }
}
