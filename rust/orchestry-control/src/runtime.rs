//! The `Runtime` context (spec.md §9): built once during bootstrap and
//! passed by reference to every worker and to the HTTP adapter, replacing
//! the global mutable singletons a naive port of the original controller
//! would reach for. Grounded on `knhk-autonomic::AutonomicController`'s
//! `Arc<RwLock<Component>>` fan-out, with that fan-out collapsed: every
//! field here is either already internally synchronized (the subsystem
//! structs each own their locks) or immutable after construction, so the
//! Runtime itself needs no lock of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use orchestry_autoscaler::Autoscaler;
use orchestry_cluster::{ClusterCallbacks, Coordinator};
use orchestry_health::HealthProber;
use orchestry_proxy::NginxManager;
use orchestry_replica::ReplicaManager;
use orchestry_store::Store;
use orchestry_telemetry::Metrics;
use orchestry_types::ClusterNode;

use crate::container_monitor::ContainerMonitor;
use crate::control_loop::ControlLoop;

/// Shared handles every worker task and the HTTP adapter need. One instance
/// per process, built in `orchestryd`'s `main` and cloned (every field is
/// an `Arc` or an already-cheap handle) into each task and into the API
/// router state.
///
/// One-way dependency chain, matching spec.md §5: `store` backs
/// `coordinator`, which backs `replicas` (leadership gates container
/// mutation), which backs `autoscaler` (replica count feeds scale
/// decisions) — nothing downstream reaches back upstream.
#[derive(Clone)]
pub struct Runtime {
    pub store: Store,
    pub coordinator: Arc<Coordinator>,
    pub replicas: Arc<ReplicaManager>,
    pub autoscaler: Arc<Autoscaler>,
    pub proxy: Arc<NginxManager>,
    pub health: Arc<HealthProber>,
    pub metrics: Arc<Metrics>,
    pub num_cpus: f64,
    running: Arc<AtomicBool>,
}

impl Runtime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        coordinator: Arc<Coordinator>,
        replicas: Arc<ReplicaManager>,
        autoscaler: Arc<Autoscaler>,
        proxy: Arc<NginxManager>,
        health: Arc<HealthProber>,
        metrics: Arc<Metrics>,
        num_cpus: f64,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            coordinator,
            replicas,
            autoscaler,
            proxy,
            health,
            metrics,
            num_cpus,
            running,
        }
    }

    /// Whether admin operations should still be accepted. Flips to `false`
    /// as the first step of the shutdown sequence (spec.md §5); workers and
    /// the HTTP adapter both observe it.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Ties the Cluster Coordinator's leadership transitions to this node's
/// leader-only worker tasks (spec.md §4.2's three callbacks). Built
/// separately from `Coordinator` — which owns an `Arc<dyn ClusterCallbacks>`
/// at construction time — and wired back to it via [`bind_coordinator`]
/// immediately after, breaking what would otherwise be a circular
/// `Coordinator -> callbacks -> Coordinator` reference.
pub struct RuntimeCallbacks {
    store: Store,
    replicas: Arc<ReplicaManager>,
    autoscaler: Arc<Autoscaler>,
    proxy: Arc<NginxManager>,
    metrics: Arc<Metrics>,
    num_cpus: f64,
    running: Arc<AtomicBool>,
    coordinator: std::sync::OnceLock<Weak<Coordinator>>,
    control_loop: AsyncMutex<Option<JoinHandle<()>>>,
    container_monitor: AsyncMutex<Option<JoinHandle<()>>>,
}

impl RuntimeCallbacks {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        replicas: Arc<ReplicaManager>,
        autoscaler: Arc<Autoscaler>,
        proxy: Arc<NginxManager>,
        metrics: Arc<Metrics>,
        num_cpus: f64,
        running: Arc<AtomicBool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            replicas,
            autoscaler,
            proxy,
            metrics,
            num_cpus,
            running,
            coordinator: std::sync::OnceLock::new(),
            control_loop: AsyncMutex::new(None),
            container_monitor: AsyncMutex::new(None),
        })
    }

    /// Must be called exactly once, right after the `Coordinator` this
    /// instance backs has been constructed.
    pub fn bind_coordinator(&self, coordinator: &Arc<Coordinator>) {
        let _ = self.coordinator.set(Arc::downgrade(coordinator));
    }

    fn coordinator_weak(&self) -> Weak<Coordinator> {
        self.coordinator.get().cloned().unwrap_or_default()
    }

    /// Best-effort stop of both leader-only tasks, used during graceful
    /// shutdown regardless of whether this node currently holds the lease.
    pub async fn stop_leader_workers(&self) {
        if let Some(handle) = self.control_loop.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.container_monitor.lock().await.take() {
            handle.abort();
        }
    }
}

#[async_trait::async_trait]
impl ClusterCallbacks for RuntimeCallbacks {
    async fn on_become_leader(&self) {
        info!("promoted to leader: restoring policies, reconciling, and starting leader-only workers");

        match self.store.list_apps(None).await {
            Ok(apps) => {
                for app in &apps {
                    if let Some(policy) = &app.scaling {
                        self.autoscaler.set_policy(&app.name, policy.clone());
                    }
                }
            }
            Err(err) => warn!(error = %err, "failed to restore scaling policies on promotion"),
        }

        if let Err(err) = self.replicas.reconcile_all().await {
            warn!(error = %err, "reconcile-all on promotion failed");
        }
        if let Err(err) = self.replicas.cleanup_orphans().await {
            warn!(error = %err, "orphan cleanup on promotion failed");
        }

        let control_loop = ControlLoop::new(
            self.store.clone(),
            self.replicas.clone(),
            self.autoscaler.clone(),
            self.proxy.clone(),
            self.metrics.clone(),
            self.num_cpus,
            self.coordinator_weak(),
            self.running.clone(),
        );
        *self.control_loop.lock().await = Some(tokio::spawn(control_loop.run()));

        let container_monitor =
            ContainerMonitor::new(self.store.clone(), self.replicas.clone(), self.running.clone());
        *self.container_monitor.lock().await = Some(tokio::spawn(container_monitor.run()));
    }

    async fn on_lose_leadership(&self) {
        info!("lost leadership: stopping leader-only workers");
        self.stop_leader_workers().await;
    }

    async fn on_cluster_change(&self, nodes: Vec<ClusterNode>) {
        tracing::debug!(node_count = nodes.len(), "cluster membership changed");
    }
}
