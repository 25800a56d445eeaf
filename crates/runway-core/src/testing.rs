//! In-memory stand-ins for the external systems.
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Notify;

use crate::client::{
    CiControlPlane, ClientError, ClientResult, ComputeProvider, CreateInstanceRequest,
};
use runway_model::{
    InstanceRecord, InstanceStatus, InstanceTemplate, Labels, PoolConfig, RegistrationRequest,
    RegistrationToken, RunnerRecord, RunnerStatus,
};

/// Blocks a call until released; `entered` fires once the call is parked.
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct CiState {
    pub runners: Vec<RunnerRecord>,
    pub token_requests: Vec<RegistrationRequest>,
    pub deleted: Vec<u64>,
    pub list_calls: usize,
    pub fail_tokens: bool,
    pub fail_list: bool,
    pub next_runner_id: u64,
    pub list_gate: Option<Gate>,
}

#[derive(Default)]
pub struct FakeCi {
    state: Mutex<CiState>,
}

impl FakeCi {
    pub fn with_runners(runners: Vec<RunnerRecord>) -> Self {
        let ci = Self::default();
        ci.state().runners = runners;
        ci
    }

    pub fn state(&self) -> MutexGuard<'_, CiState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl CiControlPlane for FakeCi {
    async fn list_runners(&self, _org: &str) -> ClientResult<Vec<RunnerRecord>> {
        let gate = {
            let mut s = self.state();
            s.list_calls += 1;
            s.list_gate.clone()
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let s = self.state();
        if s.fail_list {
            return Err(ClientError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(s.runners.clone())
    }

    async fn generate_registration_token(
        &self,
        _org: &str,
        req: &RegistrationRequest,
    ) -> ClientResult<RegistrationToken> {
        let mut s = self.state();
        s.token_requests.push(req.clone());
        if s.fail_tokens {
            return Err(ClientError::Transport("connection reset".into()));
        }
        s.next_runner_id += 1;
        Ok(RegistrationToken::new(
            format!("jit-{}", req.name),
            Some(s.next_runner_id),
        ))
    }

    async fn delete_runner(&self, _org: &str, runner_id: u64) -> ClientResult<()> {
        let mut s = self.state();
        s.deleted.push(runner_id);
        s.runners.retain(|r| r.id != runner_id);
        Ok(())
    }
}

pub struct ComputeState {
    pub instances: Vec<InstanceRecord>,
    pub created: Vec<CreateInstanceRequest>,
    pub deleted: Vec<String>,
    pub create_delay: Duration,
    pub create_gate: Option<Gate>,
    pub create_status: InstanceStatus,
    pub create_error: Option<fn() -> ClientError>,
    pub fail_delete: bool,
    pub in_flight: usize,
    pub max_in_flight: usize,
    pub creates_finished: usize,
    /// `creates_finished` observed by each `list_instances` call.
    pub finished_at_list: Vec<usize>,
}

impl Default for ComputeState {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            created: Vec::new(),
            deleted: Vec::new(),
            create_delay: Duration::ZERO,
            create_gate: None,
            create_status: InstanceStatus::Active,
            create_error: None,
            fail_delete: false,
            in_flight: 0,
            max_in_flight: 0,
            creates_finished: 0,
            finished_at_list: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeCompute {
    state: Mutex<ComputeState>,
}

impl FakeCompute {
    pub fn with_instances(instances: Vec<InstanceRecord>) -> Self {
        let compute = Self::default();
        compute.state().instances = instances;
        compute
    }

    pub fn state(&self) -> MutexGuard<'_, ComputeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ComputeProvider for FakeCompute {
    async fn create_instance(
        &self,
        req: &CreateInstanceRequest,
        _timeout: Duration,
    ) -> ClientResult<InstanceRecord> {
        let (delay, gate) = {
            let mut s = self.state();
            s.created.push(req.clone());
            s.in_flight += 1;
            s.max_in_flight = s.max_in_flight.max(s.in_flight);
            (s.create_delay, s.create_gate.clone())
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut s = self.state();
        s.in_flight -= 1;
        s.creates_finished += 1;
        if let Some(make_err) = s.create_error {
            return Err(make_err());
        }
        let instance = InstanceRecord {
            id: format!("id-{}", req.name),
            name: req.name.to_string(),
            status: s.create_status.clone(),
            created_at: Some(OffsetDateTime::now_utc()),
        };
        s.instances.push(instance.clone());
        Ok(instance)
    }

    async fn list_instances(&self) -> ClientResult<Vec<InstanceRecord>> {
        let mut s = self.state();
        let finished = s.creates_finished;
        s.finished_at_list.push(finished);
        Ok(s.instances.clone())
    }

    async fn delete_instance(&self, name_or_id: &str) -> ClientResult<()> {
        let mut s = self.state();
        s.deleted.push(name_or_id.to_string());
        if s.fail_delete {
            return Err(ClientError::Api {
                status: 500,
                message: "delete failed".into(),
            });
        }
        s.instances
            .retain(|i| i.id != name_or_id && i.name != name_or_id);
        Ok(())
    }
}

pub fn pool(label: &str, min_ready: u32) -> PoolConfig {
    PoolConfig {
        label: label.into(),
        min_ready,
        runner_group_id: 7,
        instance: InstanceTemplate {
            image: "ubuntu-24.04".into(),
            flavor: "m1.large".into(),
            network: "net-ci".into(),
            key_name: None,
            runner_user: "ci".into(),
            runner_group: "docker".into(),
        },
    }
}

pub fn runner(id: u64, name: &str, label: &str, busy: bool) -> RunnerRecord {
    RunnerRecord {
        id,
        name: name.into(),
        busy,
        labels: Labels::single(label),
        status: RunnerStatus::Online,
    }
}

/// Instance with no creation time, so no grace period applies.
pub fn instance(name: &str, status: InstanceStatus) -> InstanceRecord {
    InstanceRecord {
        id: format!("id-{name}"),
        name: name.into(),
        status,
        created_at: None,
    }
}
