use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{Snapshot, StoreEvent};
use crate::types::StreamVersion;

/// Event representation on the events table
#[derive(sqlx::FromRow, Debug)]
pub struct DbEvent {
    pub id: Uuid,
    pub stream_id: String,
    pub stream_version: StreamVersion,
    pub event_type: String,
    pub payload: Value,
    pub recorded_at: DateTime<Utc>,
}

impl From<DbEvent> for StoreEvent<Value> {
    fn from(event: DbEvent) -> Self {
        Self {
            id: event.id,
            stream_id: event.stream_id,
            stream_version: event.stream_version,
            event_type: event.event_type,
            payload: event.payload,
            recorded_at: event.recorded_at,
        }
    }
}

/// Snapshot representation on the snapshots table
#[derive(sqlx::FromRow, Debug)]
pub struct DbSnapshot {
    pub stream_id: String,
    pub stream_version: StreamVersion,
    pub aggregate_type: String,
    pub payload: Value,
    pub saved_at: DateTime<Utc>,
}

impl From<DbSnapshot> for Snapshot {
    fn from(snapshot: DbSnapshot) -> Self {
        Self {
            stream_id: snapshot.stream_id,
            stream_version: snapshot.stream_version,
            aggregate_type: snapshot.aggregate_type,
            data: snapshot.payload,
            saved_at: snapshot.saved_at,
        }
    }
}
