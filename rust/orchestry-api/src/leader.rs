//! Leader-required guard for the mutating endpoints spec.md §6 marks
//! *leader-required*: a follower must answer 503 with the current leader
//! named in `X-Current-Leader`, never by redirecting the call itself.

use orchestry_control::Runtime;
use orchestry_types::OrchestryError;

use crate::error::ApiError;

pub async fn require_leader(runtime: &Runtime) -> Result<(), ApiError> {
    if runtime.coordinator.is_leader() {
        return Ok(());
    }

    let current_leader = runtime
        .store
        .get_lease()
        .await
        .ok()
        .flatten()
        .map(|lease| lease.held_by);

    Err(ApiError(OrchestryError::NotLeader { current_leader }))
}

#[cfg(test)]
mod tests {
    // `require_leader` only branches on `Coordinator::is_leader`, which
    // needs a live Postgres-backed `Store` to construct a `Coordinator` —
    // exercised end-to-end by the cluster-coordinator crate's own tests
    // rather than re-mocked here.
}
