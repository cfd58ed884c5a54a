//! Read-only store dump commands, recovered from the original
//! `view_docker_db.py`/`view_db.py` debug scripts (SPEC_FULL.md §12).
//! These talk directly to Postgres via `orchestry-store`, independent of
//! a running `orchestryd`/admin API — useful when the control plane
//! itself is down and an operator needs to see what state it left behind.

use orchestry_store::Store;
use orchestry_types::App;

use crate::error::Result;

pub async fn connect(config: &orchestry_config::Config) -> Result<Store> {
    let store = Store::connect(&config.postgres.primary_url(), config.postgres.replica_url().as_deref()).await?;
    Ok(store)
}

pub async fn apps(store: &Store) -> Result<Vec<App>> {
    Ok(store.list_apps(None).await?)
}

pub async fn instances(store: &Store, app: &str) -> Result<Vec<orchestry_types::ContainerInstance>> {
    Ok(store.get_instances(app, None).await?)
}
