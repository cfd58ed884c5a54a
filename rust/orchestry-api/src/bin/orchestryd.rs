//! The Orchestry control-plane daemon: one process per node. Wires every
//! core crate into a [`Runtime`], starts the cluster coordinator and the
//! cross-node health sync, serves the admin HTTP API, and drives the
//! graceful shutdown sequence in spec.md §5 on `SIGINT`/`SIGTERM`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::{error, info};

use orchestry_cluster::{CoordinatorConfig, Coordinator};
use orchestry_config::Config;
use orchestry_control::{HealthSyncWorker, Runtime, RuntimeCallbacks};
use orchestry_health::HealthProber;
use orchestry_proxy::NginxManager;
use orchestry_replica::{DockerRuntime, ReplicaManager};
use orchestry_store::Store;
use orchestry_telemetry::{init_tracing, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_format = match std::env::var("ORCHESTRY_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Compact,
    };
    init_tracing(log_format);

    let config = Config::from_env()?;
    info!(node_id = %config.cluster.node_id, "starting orchestryd");

    let store = Store::connect(
        &config.postgres.primary_url(),
        config.postgres.replica_url().as_deref(),
    )
    .await?;

    let docker = DockerRuntime::connect()?;
    let proxy = NginxManager::new(
        config.nginx.conf_dir.clone(),
        Some(config.nginx.container_name.clone()),
        config.nginx.status_url.clone(),
    );
    let replicas = Arc::new(ReplicaManager::new(docker, store.clone(), proxy.clone()));
    let autoscaler = Arc::new(orchestry_autoscaler::Autoscaler::new());
    let health = Arc::new(HealthProber::new(store.clone()));
    let metrics = Arc::new(orchestry_telemetry::Metrics::new()?);
    let num_cpus = std::thread::available_parallelism().map(|n| n.get() as f64).unwrap_or(1.0);
    let running = Arc::new(AtomicBool::new(true));

    let advertise_url = format!("http://{}:{}", config.cluster.hostname, config.api.port);
    let coordinator_config = CoordinatorConfig::new(
        config.cluster.node_id.clone(),
        config.cluster.hostname.clone(),
        advertise_url,
    );

    let callbacks = RuntimeCallbacks::new(
        store.clone(),
        replicas.clone(),
        autoscaler.clone(),
        Arc::new(proxy.clone()),
        metrics.clone(),
        num_cpus,
        running.clone(),
    );
    let coordinator = Arc::new(Coordinator::new(store.clone(), coordinator_config, callbacks.clone()));
    callbacks.bind_coordinator(&coordinator);

    let runtime = Arc::new(Runtime::new(
        store.clone(),
        coordinator.clone(),
        replicas.clone(),
        autoscaler.clone(),
        Arc::new(proxy.clone()),
        health.clone(),
        metrics.clone(),
        num_cpus,
        running.clone(),
    ));

    let coordinator_handle = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(err) = coordinator.run().await {
                error!(error = %err, "cluster coordinator exited");
            }
        })
    };

    let health_sync = HealthSyncWorker::new(store.clone(), health.clone(), replicas.clone(), coordinator.clone(), running.clone());
    let health_sync_handle = tokio::spawn(health_sync.run());

    let app = orchestry_api::build_router(runtime.clone());
    let listener = tokio::net::TcpListener::bind((config.api.host.as_str(), config.api.port)).await?;
    info!(host = %config.api.host, port = config.api.port, "admin API listening");

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("admin API server failed");
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        _ = server => {
            error!("admin API server exited unexpectedly");
        }
    }

    // spec.md §5 shutdown sequence: stop accepting admin mutations first,
    // then release leadership, then stop the leader-only and cross-node
    // workers, then close the store. Each step is best-effort with a bound
    // on how long it can block the process from exiting.
    runtime.stop();
    coordinator.shutdown().await;
    callbacks.stop_leader_workers().await;
    coordinator_handle.abort();
    health_sync_handle.abort();

    info!("orchestryd stopped");
    Ok(())
}
