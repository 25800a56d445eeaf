use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context as _, bail, ensure};
use serde::Deserialize;

use runway_cloud::OpenStackCredentials;
use runway_core::{
    gc::DEFAULT_INSTANCE_GRACE,
    pool::DEFAULT_MAX_WORKERS,
    provision::{DEFAULT_CREATE_TIMEOUT, ProvisionerConfig},
    reconcile::{DEFAULT_INTERVAL, ReconcilerConfig},
};
use runway_model::PoolConfig;
use runway_observe::LoggerConfig;

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const OS_PASSWORD_ENV: &str = "OS_PASSWORD";

/// Daemon configuration file.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    pub github: GithubSection,
    pub openstack: OpenStackSection,
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub reconcile: ReconcileSection,
    #[serde(default)]
    pub bootstrap: BootstrapSection,
    #[serde(default)]
    pub logger: LoggerConfig,
}

#[derive(Debug, Deserialize)]
pub struct GithubSection {
    pub org: String,
    /// Falls back to `GITHUB_TOKEN` when empty.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenStackSection {
    #[serde(flatten)]
    pub credentials: OpenStackCredentials,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReconcileSection {
    pub interval_secs: u64,
    pub max_workers: usize,
    pub create_timeout_secs: u64,
    pub instance_grace_secs: u64,
    pub revoke_on_failure: bool,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            max_workers: DEFAULT_MAX_WORKERS,
            create_timeout_secs: DEFAULT_CREATE_TIMEOUT.as_secs(),
            instance_grace_secs: DEFAULT_INSTANCE_GRACE.as_secs(),
            revoke_on_failure: false,
        }
    }
}

impl ReconcileSection {
    pub fn reconciler(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            interval: Duration::from_secs(self.interval_secs),
            max_workers: self.max_workers,
        }
    }

    pub fn provisioner(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            create_timeout: Duration::from_secs(self.create_timeout_secs),
            revoke_on_failure: self.revoke_on_failure,
        }
    }

    pub fn instance_grace(&self) -> Duration {
        Duration::from_secs(self.instance_grace_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct BootstrapSection {
    /// Replaces the embedded start script.
    pub script_path: Option<PathBuf>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_api_url() -> String {
    runway_cloud::github::DEFAULT_API_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    runway_cloud::openstack::DEFAULT_POLL_INTERVAL.as_secs()
}

impl Config {
    /// Read, complete from the environment and validate.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut cfg = Self::parse(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        cfg.fill_secrets(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Take secrets left empty in the file from `lookup`.
    pub fn fill_secrets(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.github.token.is_empty() {
            if let Some(token) = lookup(GITHUB_TOKEN_ENV) {
                self.github.token = token;
            }
        }
        if let OpenStackCredentials::Password(auth) = &mut self.openstack.credentials {
            if auth.password.is_empty() {
                if let Some(password) = lookup(OS_PASSWORD_ENV) {
                    auth.password = password;
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.github.org.trim().is_empty(), "github.org must be set");
        ensure!(
            !self.github.token.is_empty(),
            "github.token is empty and {GITHUB_TOKEN_ENV} is not set"
        );
        match &self.openstack.credentials {
            OpenStackCredentials::Password(auth) if auth.password.is_empty() => {
                bail!("openstack.auth.password is empty and {OS_PASSWORD_ENV} is not set")
            }
            OpenStackCredentials::Static(auth) if auth.token.is_empty() => {
                bail!("openstack.static.token must be set")
            }
            _ => {}
        }
        ensure!(!self.pools.is_empty(), "at least one pool must be configured");
        ensure!(self.reconcile.interval_secs > 0, "reconcile.interval_secs must be positive");
        ensure!(self.reconcile.max_workers > 0, "reconcile.max_workers must be positive");
        ensure!(
            self.reconcile.create_timeout_secs > 0,
            "reconcile.create_timeout_secs must be positive"
        );
        ensure!(
            self.openstack.poll_interval_secs > 0,
            "openstack.poll_interval_secs must be positive"
        );
        Ok(())
    }
}
