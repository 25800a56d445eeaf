use serde::{Deserialize, Serialize};

use crate::{Labels, RunnerName};

/// Connection state reported by the CI control plane.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    Online,
    Offline,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Runner registration as listed by the CI control plane.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerRecord {
    pub id: u64,
    pub name: String,
    pub busy: bool,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: RunnerStatus,
}

impl RunnerRecord {
    /// Returns `true` if the runner is not executing a job.
    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.busy
    }

    /// Returns `true` if the runner carries `label`.
    #[inline]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Returns `true` if this runner was created by this system.
    #[inline]
    pub fn is_managed(&self) -> bool {
        RunnerName::is_managed(&self.name)
    }
}
