use std::{convert::Infallible, fmt, str::FromStr};

use serde::Deserialize;

use crate::{
    Labels,
    error::{ModelError, ModelResult},
};

/// Lifecycle transition carried by a workflow job event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobAction {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Other(String),
}

impl FromStr for JobAction {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "queued" => JobAction::Queued,
            "in_progress" => JobAction::InProgress,
            "completed" => JobAction::Completed,
            "waiting" => JobAction::Waiting,
            _ => JobAction::Other(s.to_string()),
        })
    }
}

impl JobAction {
    /// Bounded label value for metrics; every unrecognized action maps to `"other"`.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            JobAction::Queued => "queued",
            JobAction::InProgress => "in_progress",
            JobAction::Completed => "completed",
            JobAction::Waiting => "waiting",
            JobAction::Other(_) => "other",
        }
    }
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobAction::Other(s) => f.write_str(s),
            known => f.write_str(known.as_label()),
        }
    }
}

/// Inbound CI event about one workflow job, reduced to the fields the dispatcher needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobEvent {
    pub action: JobAction,
    /// Organization login; `None` for events outside an organization.
    pub organization: Option<String>,
    /// Labels requested by the job.
    pub labels: Labels,
    /// Runner the job was assigned to; unset until the job is picked up.
    pub runner_name: Option<String>,
    pub job_id: Option<u64>,
}

impl JobEvent {
    /// Parse a `workflow_job` webhook body.
    ///
    /// The action is taken from the top-level `action` field and falls back to
    /// `workflow_job.action`. An empty `runner_name` is treated as absent.
    pub fn from_slice(body: &[u8]) -> ModelResult<Self> {
        let payload: WorkflowJobPayload =
            serde_json::from_slice(body).map_err(|e| ModelError::MalformedEvent(e.to_string()))?;
        payload.try_into()
    }
}

#[derive(Deserialize)]
struct WorkflowJobPayload {
    action: Option<String>,
    organization: Option<Organization>,
    workflow_job: WorkflowJob,
}

#[derive(Deserialize)]
struct Organization {
    login: String,
}

#[derive(Deserialize)]
struct WorkflowJob {
    id: Option<u64>,
    action: Option<String>,
    #[serde(default)]
    labels: Labels,
    runner_name: Option<String>,
}

impl TryFrom<WorkflowJobPayload> for JobEvent {
    type Error = ModelError;
    fn try_from(p: WorkflowJobPayload) -> Result<Self, Self::Error> {
        let action = p
            .action
            .or(p.workflow_job.action)
            .ok_or_else(|| ModelError::MalformedEvent("missing action".into()))?;
        let Ok(action) = action.parse::<JobAction>();

        Ok(JobEvent {
            action,
            organization: p.organization.map(|o| o.login),
            labels: p.workflow_job.labels,
            runner_name: p.workflow_job.runner_name.filter(|n| !n.trim().is_empty()),
            job_id: p.workflow_job.id,
        })
    }
}
