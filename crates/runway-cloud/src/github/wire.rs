use serde::{Deserialize, Serialize};

use runway_model::{Labels, RunnerRecord, RunnerStatus};

#[derive(Deserialize)]
pub(super) struct RunnersPage {
    #[serde(default)]
    pub total_count: usize,
    pub runners: Vec<Runner>,
}

#[derive(Deserialize)]
pub(super) struct Runner {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: RunnerStatus,
    #[serde(default)]
    pub busy: bool,
    #[serde(default)]
    pub labels: Vec<RunnerLabel>,
}

#[derive(Deserialize)]
pub(super) struct RunnerLabel {
    pub name: String,
}

impl From<Runner> for RunnerRecord {
    fn from(r: Runner) -> Self {
        RunnerRecord {
            id: r.id,
            name: r.name,
            busy: r.busy,
            labels: r.labels.into_iter().map(|l| l.name).collect::<Labels>(),
            status: r.status,
        }
    }
}

#[derive(Serialize)]
pub(super) struct JitConfigRequest<'a> {
    pub name: &'a str,
    pub runner_group_id: u64,
    pub labels: &'a [String],
    pub work_folder: &'a str,
}

#[derive(Deserialize)]
pub(super) struct JitConfigResponse {
    pub runner: JitRunner,
    pub encoded_jit_config: String,
}

#[derive(Deserialize)]
pub(super) struct JitRunner {
    pub id: u64,
}
