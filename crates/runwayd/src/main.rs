use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use taskvisor::{Config as SupervisorConfig, ControllerConfig, Subscribe};
use tracing::{info, warn};

use runway_api::{DispatcherAdapter, HttpApi};
use runway_cloud::{GithubClient, OpenStackClient};
use runway_core::prelude::*;
use runway_model::PoolRegistry;
use runway_observe::{TaskEventLogger, init_logger};
use runway_prometheus::PrometheusMetrics;

mod config;
use config::Config;

#[derive(Debug, Parser)]
#[command(name = "runwayd", version, about = "Autoscaler for ephemeral self-hosted CI runners")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short, env = "RUNWAY_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the webhook listen address.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) config + logger
    let mut cfg = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }
    init_logger(&cfg.logger)?;
    info!(config = %cli.config.display(), org = %cfg.github.org, pools = cfg.pools.len(), "configuration loaded");

    // 2) clients + metrics
    let metrics = PrometheusMetrics::new().context("failed to register metrics")?;
    let github = GithubClient::new(&cfg.github.api_url, &cfg.github.token)
        .context("failed to build github client")?;
    let openstack = OpenStackClient::new(cfg.openstack.credentials.clone())
        .context("failed to build openstack client")?
        .with_poll_interval(Duration::from_secs(cfg.openstack.poll_interval_secs));

    let ctx = Context::new(cfg.github.org.as_str(), Arc::new(github), Arc::new(openstack))
        .with_metrics(Arc::new(metrics.clone()));

    // 3) core components
    let pools = Arc::new(PoolRegistry::new(cfg.pools.clone()).context("invalid pool list")?);
    let bootstrap = match &cfg.bootstrap.script_path {
        Some(path) => {
            let script = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read bootstrap script {}", path.display()))?;
            BootstrapTemplate::new(script)?
        }
        None => BootstrapTemplate::embedded(),
    };
    let provisioner = Arc::new(Provisioner::new(
        ctx.clone(),
        bootstrap,
        cfg.reconcile.provisioner(),
    ));
    let gc = OrphanGc::new(ctx.clone()).with_grace(cfg.reconcile.instance_grace());
    let reconciler = Arc::new(Reconciler::new(
        ctx.clone(),
        Arc::clone(&pools),
        Arc::clone(&provisioner),
        gc,
        cfg.reconcile.reconciler(),
    ));
    let dispatcher = Arc::new(EventDispatcher::new(ctx, Arc::clone(&pools), provisioner));

    // 4) supervisor + reconcile task
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(TaskEventLogger)];
    let supervisor = SupervisorHandle::start(
        SupervisorConfig::default(),
        ControllerConfig::default(),
        subscribers,
    )
    .await;
    supervisor
        .submit(reconcile_task(Arc::clone(&reconciler)))
        .await
        .context("failed to submit reconcile task")?;
    info!(
        interval_ms = reconciler.interval().as_millis() as u64,
        pools = pools.len(),
        "reconcile task submitted"
    );

    // 5) webhook server
    let router = HttpApi::new(Arc::new(DispatcherAdapter::new(Arc::clone(&dispatcher))))
        .with_metrics(Arc::new(metrics))
        .router();
    let listener = tokio::net::TcpListener::bind(cfg.listen)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen))?;
    info!(addr = %cfg.listen, "webhook server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")?;

    // 6) drain
    let drain = cfg.reconcile.provisioner().create_timeout;
    if let Err(e) = supervisor.stopped(drain).await {
        warn!(error = %e, "supervisor ended abnormally");
    }

    info!(in_flight = dispatcher.in_flight(), "waiting for event work to finish");
    if tokio::time::timeout(drain, dispatcher.wait_idle()).await.is_err() {
        warn!(
            in_flight = dispatcher.in_flight(),
            "event work still running at shutdown; leftovers are collected on next start"
        );
    }

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
