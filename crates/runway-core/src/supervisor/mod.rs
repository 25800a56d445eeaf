//! Owns the taskvisor [`Supervisor`] that runs the periodic background work.
//!
//! The supervisor's run loop is spawned on construction and stops on an OS shutdown
//! signal. Its outcome is kept rather than turned into a panic.
use std::{sync::Arc, time::Duration};

use taskvisor::{
    Config as SupervisorConfig, ControllerConfig, ControllerSpec, Subscribe, Supervisor,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::CoreError;

pub struct SupervisorHandle {
    sup: Arc<Supervisor>,
    run: JoinHandle<Result<(), String>>,
}

impl SupervisorHandle {
    /// Build the supervisor, start its run loop and wait until it accepts submissions.
    pub async fn start(
        sup_cfg: SupervisorConfig,
        ctrl_cfg: ControllerConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let sup = Supervisor::builder(sup_cfg)
            .with_subscribers(subscribers)
            .with_controller(ctrl_cfg)
            .build();

        let runner = Arc::clone(&sup);
        let run = tokio::spawn(async move {
            runner.run(Vec::new()).await.map_err(|e| e.to_string())
        });
        sup.wait_ready().await;
        info!("supervisor is ready to accept tasks");
        Self { sup, run }
    }

    /// Submit a [`ControllerSpec`]; its slot name is the task name.
    #[instrument(level = "debug", skip(self, spec))]
    pub async fn submit(&self, spec: ControllerSpec) -> Result<(), CoreError> {
        debug!("submitting via controller");
        self.sup
            .submit(spec)
            .await
            .map_err(|e| CoreError::Supervisor(e.to_string()))
    }

    /// Wait up to `grace` for the run loop to finish.
    ///
    /// The loop is aborted if it is still running once `grace` elapses.
    pub async fn stopped(self, grace: Duration) -> Result<(), CoreError> {
        let mut run = self.run;
        match tokio::time::timeout(grace, &mut run).await {
            Ok(Ok(res)) => res.map_err(CoreError::Supervisor),
            Ok(Err(e)) => Err(CoreError::Supervisor(format!("run loop task failed: {e}"))),
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    "supervisor still running; aborting"
                );
                run.abort();
                Ok(())
            }
        }
    }
}
