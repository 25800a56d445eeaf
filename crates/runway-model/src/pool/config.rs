use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_RUNNER_GROUP, DEFAULT_RUNNER_USER,
    error::{ModelError, ModelResult},
};

/// Policy for one labeled pool of runners.
///
/// Loaded once at startup and immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Job label routed to this pool. Unique across the registry.
    pub label: String,
    /// Number of idle runners the reconciler keeps ready.
    #[serde(default)]
    pub min_ready: u32,
    /// CI runner group the registrations are placed into.
    pub runner_group_id: u64,
    /// Compute template used for every instance of this pool.
    pub instance: InstanceTemplate,
}

/// Compute-side template for a pool's instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTemplate {
    /// Image name or id.
    pub image: String,
    /// Flavor name or id.
    pub flavor: String,
    /// Network id the instance is attached to.
    pub network: String,
    /// Optional keypair injected into the instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// Local account the runner process runs as inside the instance.
    #[serde(default = "default_runner_user")]
    pub runner_user: String,
    /// Primary group of `runner_user`.
    #[serde(default = "default_runner_group")]
    pub runner_group: String,
}

fn default_runner_user() -> String {
    DEFAULT_RUNNER_USER.to_string()
}

fn default_runner_group() -> String {
    DEFAULT_RUNNER_GROUP.to_string()
}

/// Portable POSIX account name: `[a-z_][a-z0-9_-]*`, at most 32 bytes.
fn is_account_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.len() <= 32
        && (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl PoolConfig {
    /// Validate the pool before it is admitted into a registry.
    ///
    /// Rules:
    /// - `label` is not empty or whitespace-only;
    /// - `image`, `flavor` and `network` are not empty;
    /// - `runner_user` and `runner_group` are plain account names (they are spliced into a shell script).
    pub fn validate(&self) -> ModelResult<()> {
        if self.label.trim().is_empty() {
            return Err(ModelError::Invalid("pool label is empty".into()));
        }

        let t = &self.instance;
        for (field, value) in [
            ("image", &t.image),
            ("flavor", &t.flavor),
            ("network", &t.network),
        ] {
            if value.trim().is_empty() {
                return Err(ModelError::InvalidPool {
                    label: self.label.clone(),
                    reason: format!("instance.{field} is empty"),
                });
            }
        }
        for (field, value) in [
            ("runner_user", &t.runner_user),
            ("runner_group", &t.runner_group),
        ] {
            if !is_account_name(value) {
                return Err(ModelError::InvalidPool {
                    label: self.label.clone(),
                    reason: format!("instance.{field} {value:?} is not a valid account name"),
                });
            }
        }
        Ok(())
    }
}
