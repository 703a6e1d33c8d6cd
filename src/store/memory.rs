use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::event::NewEvent;
use crate::store::{EventStore, Snapshot, StoreError, StoreEvent};
use crate::types::StreamVersion;

/// In-process implementation of the [`EventStore`], keeping everything in memory.
///
/// The compare-and-append runs while holding the write lock, so concurrent appenders on the same
/// stream are serialized and every stale writer gets a [`StoreError::WrongExpectedVersion`].
///
/// The store is protected by an [`Arc`] that allows it to be cloneable still having the same memory
/// reference.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InnerInMemoryStore>>,
}

#[derive(Default)]
struct InnerInMemoryStore {
    events: HashMap<String, Vec<StoreEvent<Value>>>,
    // Every snapshot is retained, keyed by version; only the last entry is ever read.
    snapshots: HashMap<String, BTreeMap<StreamVersion, Snapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many snapshots have been kept for the given stream.
    pub async fn snapshot_count(&self, stream_id: &str) -> usize {
        self.inner
            .read()
            .await
            .snapshots
            .get(stream_id)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append_events(
        &self,
        stream_id: &str,
        expected_version: StreamVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError> {
        let mut guard = self.inner.write().await;
        let stream = guard.events.entry(stream_id.to_string()).or_default();

        let actual = stream.len() as StreamVersion;
        if actual != expected_version {
            return Err(StoreError::WrongExpectedVersion {
                stream_id: stream_id.to_string(),
                expected: expected_version,
                actual: Some(actual),
            });
        }

        let recorded_at = Utc::now();
        let store_events: Vec<StoreEvent<Value>> = events
            .into_iter()
            .zip(expected_version + 1..)
            .map(|(event, stream_version)| StoreEvent {
                id: Uuid::new_v4(),
                stream_id: stream_id.to_string(),
                stream_version,
                event_type: event.event_type,
                payload: event.data,
                recorded_at,
            })
            .collect();

        stream.extend(store_events.iter().cloned());

        Ok(store_events)
    }

    async fn read_stream_forward(
        &self,
        stream_id: &str,
        from_version: StreamVersion,
        max_count: usize,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError> {
        let guard = self.inner.read().await;

        Ok(guard
            .events
            .get(stream_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|event| event.stream_version >= from_version)
                    .take(max_count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn stream_version(&self, stream_id: &str) -> Result<StreamVersion, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .events
            .get(stream_id)
            .map_or(0, |stream| stream.len() as StreamVersion))
    }

    async fn get_latest_snapshot(&self, stream_id: &str) -> Result<Option<Snapshot>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .snapshots
            .get(stream_id)
            .and_then(|snapshots| snapshots.values().next_back())
            .cloned())
    }

    async fn save_snapshot(
        &self,
        stream_id: &str,
        stream_version: StreamVersion,
        aggregate_type: &str,
        data: Value,
    ) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let _ = guard
            .snapshots
            .entry(stream_id.to_string())
            .or_default()
            .entry(stream_version)
            .or_insert_with(|| Snapshot {
                stream_id: stream_id.to_string(),
                stream_version,
                aggregate_type: aggregate_type.to_string(),
                data,
                saved_at: Utc::now(),
            });

        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish_non_exhaustive()
    }
}
