//! Audit event types (spec.md §3, §6 events endpoint).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of event recorded against an App's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Registered,
    Started,
    Stopped,
    ScaledUp { from: u32, to: u32 },
    ScaledDown { from: u32, to: u32 },
    ReplicaFailed { replica_index: u32 },
    ReplicaRestarted { replica_index: u32 },
    PolicyUpdated,
    LeaderElected { node_id: String },
    LeaderLost { node_id: String },
}

/// A single recorded event (spec.md §6 `GET /apps/{name}/events`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: uuid::Uuid,
    pub app_name: Option<String>,
    pub kind: EventKind,
    pub message: String,
    pub detail: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}
