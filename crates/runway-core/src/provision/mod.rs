//! Scale-up unit of work: one call, one runner instance.
//!
//! Steps:
//! 1. mint a [`RunnerName`];
//! 2. exchange it for a single-use registration token (the only side-effect-free failure point);
//! 3. render the cloud-init bootstrap payload with the token;
//! 4. create the instance and wait, bounded by `create_timeout`, for it to be reported active.
//!
//! The name stays in the context's [`PendingNames`](crate::PendingNames) for the
//! whole call, so the collector never reaps a registration whose instance is
//! still being created.
//!
//! "Ready" is the provider's active status. The runner registering inside the
//! instance is not awaited.
mod error;
pub use error::ProvisionError;

use std::time::{Duration, Instant};

use tracing::{Instrument, Span, debug, info, info_span, instrument, warn};

use crate::{
    Context,
    bootstrap::BootstrapTemplate,
    client::{ClientError, CreateInstanceRequest},
    metrics::ProvisionOutcome,
};
use runway_model::{
    InstanceRecord, InstanceStatus, PoolConfig, RegistrationRequest, RegistrationToken, RunnerName,
};

/// Default deadline for an instance to become active.
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ProvisionerConfig {
    /// How long instance creation may block before failing with [`ProvisionError::CreateTimeout`].
    pub create_timeout: Duration,
    /// Delete the CI-side registration reserved by the token when instance creation fails.
    ///
    /// Off by default: the unused token is single-use and inert, and a stray
    /// registration is reaped by the next garbage collection pass.
    pub revoke_on_failure: bool,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            create_timeout: DEFAULT_CREATE_TIMEOUT,
            revoke_on_failure: false,
        }
    }
}

/// Result of a successful provisioning call.
#[derive(Clone, Debug)]
pub struct Provisioned {
    pub name: RunnerName,
    pub instance: InstanceRecord,
}

/// Creates runner instances for a pool. Safe to call concurrently.
pub struct Provisioner {
    ctx: Context,
    bootstrap: BootstrapTemplate,
    config: ProvisionerConfig,
}

impl Provisioner {
    pub fn new(ctx: Context, bootstrap: BootstrapTemplate, config: ProvisionerConfig) -> Self {
        Self {
            ctx,
            bootstrap,
            config,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Provision one runner instance for `pool`.
    #[instrument(
        name = "provision",
        skip(self, pool),
        fields(pool = %pool.label, runner_group_id = pool.runner_group_id, runner = tracing::field::Empty)
    )]
    pub async fn provision(&self, pool: &PoolConfig) -> Result<Provisioned, ProvisionError> {
        let started = Instant::now();
        let res = self.try_provision(pool).await;

        let outcome = match &res {
            Ok(_) => ProvisionOutcome::Success,
            Err(e) => e.outcome(),
        };
        self.ctx.metrics().record_provision(
            &pool.label,
            outcome,
            started.elapsed().as_millis() as u64,
        );
        res
    }

    async fn try_provision(&self, pool: &PoolConfig) -> Result<Provisioned, ProvisionError> {
        let name = RunnerName::generate();
        Span::current().record("runner", name.as_str());
        let _pending = self.ctx.pending().track(name.as_str());

        let registration = RegistrationRequest {
            name: name.clone(),
            runner_group_id: pool.runner_group_id,
            labels: vec![pool.label.clone()],
        };
        let token = self
            .ctx
            .ci()
            .generate_registration_token(self.ctx.org(), &registration)
            .await
            .map_err(|e| {
                warn!(error = %e, "registration token request failed; no instance created");
                ProvisionError::Token(e)
            })?;
        debug!(runner_id = ?token.runner_id(), "registration token issued");

        let user_data = match self.bootstrap.render(&token, &pool.instance).to_user_data() {
            Ok(user_data) => user_data,
            Err(e) => {
                self.revoke_after_failure(&token).await;
                return Err(ProvisionError::Bootstrap(e.to_string()));
            }
        };

        let req = CreateInstanceRequest::from_template(name.clone(), &pool.instance, user_data);
        match self.create(&req).await {
            Ok(instance) => {
                info!(instance_id = %instance.id, "instance active");
                Ok(Provisioned { name, instance })
            }
            Err(e) => {
                warn!(error = %e, "instance creation failed");
                self.revoke_after_failure(&token).await;
                Err(e)
            }
        }
    }

    async fn create(&self, req: &CreateInstanceRequest) -> Result<InstanceRecord, ProvisionError> {
        let timeout = self.config.create_timeout;
        let name = req.name.to_string();

        debug!(
            image = %req.image,
            flavor = %req.flavor,
            network = %req.network,
            timeout_ms = timeout.as_millis() as u64,
            "requesting instance"
        );
        let call = self.ctx.compute().create_instance(req, timeout);
        let instance = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(instance)) => instance,
            Ok(Err(ClientError::Timeout(_))) | Err(_) => {
                return Err(ProvisionError::CreateTimeout { name, timeout });
            }
            Ok(Err(source)) => return Err(ProvisionError::Create { name, source }),
        };

        if instance.status != InstanceStatus::Active {
            return Err(ProvisionError::InstanceFailed {
                name,
                status: instance.status.to_string(),
            });
        }
        Ok(instance)
    }

    async fn revoke_after_failure(&self, token: &RegistrationToken) {
        let Some(runner_id) = token.runner_id() else {
            return;
        };
        if !self.config.revoke_on_failure {
            debug!(runner_id, "unused registration left for garbage collection");
            return;
        }

        async {
            match self.ctx.ci().delete_runner(self.ctx.org(), runner_id).await {
                Ok(()) => info!("revoked unused registration"),
                Err(e) => warn!(error = %e, "failed to revoke unused registration"),
            }
        }
        .instrument(info_span!("revoke_registration", runner_id))
        .await
    }
}
