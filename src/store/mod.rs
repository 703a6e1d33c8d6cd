use std::ops::Deref;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::event::NewEvent;
use crate::types::StreamVersion;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The stream moved on since the caller read it. Nothing has been appended.
    #[error("wrong expected version for stream `{stream_id}`: expected {expected}, actual {actual:?}")]
    WrongExpectedVersion {
        stream_id: String,
        expected: StreamVersion,
        /// The actual current version, when the store was able to observe it.
        actual: Option<StreamVersion>,
    },
    /// Sql error
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    /// Any other failure of the backing store.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn is_wrong_expected_version(&self) -> bool {
        matches!(self, Self::WrongExpectedVersion { .. })
    }
}

/// An EventStore is responsible for appending the events a stream emits into a durable, append-only log,
/// reading them back in order, and keeping the latest snapshot of each stream.
///
/// Per-stream mutual exclusion is entirely up to [`EventStore::append_events`]: it must be a single
/// atomic compare-and-append. No other lock is taken by the callers.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically checks that the stream is at `expected_version` and appends the given events with
    /// versions `expected_version + 1 ..= expected_version + events.len()`.
    ///
    /// Either all the events are appended, or none are.
    ///
    /// # Errors
    ///
    /// Will return [`StoreError::WrongExpectedVersion`] if the stream's current version differs from
    /// `expected_version`.
    async fn append_events(
        &self,
        stream_id: &str,
        expected_version: StreamVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError>;

    /// Returns at most `max_count` events with `stream_version >= from_version`, ascending.
    ///
    /// Unknown streams and out of range starts yield an empty vector.
    async fn read_stream_forward(
        &self,
        stream_id: &str,
        from_version: StreamVersion,
        max_count: usize,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError>;

    /// Returns the current version of the stream, `0` if it has no events.
    async fn stream_version(&self, stream_id: &str) -> Result<StreamVersion, StoreError>;

    /// Returns the snapshot with the highest version for the stream, if any.
    async fn get_latest_snapshot(&self, stream_id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Saves a snapshot. Saving again at an already stored version leaves the stored one in place.
    async fn save_snapshot(
        &self,
        stream_id: &str,
        stream_version: StreamVersion,
        aggregate_type: &str,
        data: Value,
    ) -> Result<(), StoreError>;
}

/// Blanket implementation making an [`EventStore`] every (smart) pointer to an [`EventStore`],
/// e.g. `&Store`, `Box<Store>`, `Arc<Store>`, `Box<dyn EventStore>`.
#[async_trait]
impl<S, T> EventStore for T
where
    S: EventStore + ?Sized,
    T: Deref<Target = S> + Send + Sync,
{
    /// Deref call to [`EventStore::append_events`].
    async fn append_events(
        &self,
        stream_id: &str,
        expected_version: StreamVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError> {
        self.deref().append_events(stream_id, expected_version, events).await
    }

    /// Deref call to [`EventStore::read_stream_forward`].
    async fn read_stream_forward(
        &self,
        stream_id: &str,
        from_version: StreamVersion,
        max_count: usize,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError> {
        self.deref().read_stream_forward(stream_id, from_version, max_count).await
    }

    /// Deref call to [`EventStore::stream_version`].
    async fn stream_version(&self, stream_id: &str) -> Result<StreamVersion, StoreError> {
        self.deref().stream_version(stream_id).await
    }

    /// Deref call to [`EventStore::get_latest_snapshot`].
    async fn get_latest_snapshot(&self, stream_id: &str) -> Result<Option<Snapshot>, StoreError> {
        self.deref().get_latest_snapshot(stream_id).await
    }

    /// Deref call to [`EventStore::save_snapshot`].
    async fn save_snapshot(
        &self,
        stream_id: &str,
        stream_version: StreamVersion,
        aggregate_type: &str,
        data: Value,
    ) -> Result<(), StoreError> {
        self.deref()
            .save_snapshot(stream_id, stream_version, aggregate_type, data)
            .await
    }
}

/// A `StoreEvent` contains the payload (the original event) alongside the event's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent<Payload> {
    /// Uniquely identifies an event among all events of all streams.
    pub id: Uuid,
    /// The stream the event belongs to.
    pub stream_id: String,
    /// The position of the event within its stream, starting from 1.
    pub stream_version: StreamVersion,
    /// The event type tag.
    pub event_type: String,
    /// The original, emitted, event.
    pub payload: Payload,
    /// The timestamp of when the event is persisted.
    pub recorded_at: DateTime<Utc>,
}

impl<Payload> StoreEvent<Payload> {
    /// Returns the version of the event, within its stream.
    pub const fn stream_version(&self) -> StreamVersion {
        self.stream_version
    }

    /// Returns the original, emitted, event.
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }
}

impl StoreEvent<Value> {
    /// Deserializes the stored payload into the domain event type, keeping the metadata.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if the payload doesn't match the event type.
    pub fn deserialize<E: DeserializeOwned>(self) -> Result<StoreEvent<E>, serde_json::Error> {
        Ok(StoreEvent {
            id: self.id,
            stream_id: self.stream_id,
            stream_version: self.stream_version,
            event_type: self.event_type,
            payload: serde_json::from_value(self.payload)?,
            recorded_at: self.recorded_at,
        })
    }
}

/// A cached materialization of a stream's state, computed by folding exactly `stream_version` events.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub stream_id: String,
    pub stream_version: StreamVersion,
    pub aggregate_type: String,
    pub data: Value,
    pub saved_at: DateTime<Utc>,
}
