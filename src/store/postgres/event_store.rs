use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Transaction};
use uuid::Uuid;

use crate::event::NewEvent;
use crate::store::{EventStore, Snapshot, StoreError, StoreEvent};
use crate::types::StreamVersion;

use super::event::{DbEvent, DbSnapshot};
use super::statements::Statements;

// SQLSTATE raised when a racing writer already inserted the same `(stream_id, stream_version)`.
const UNIQUE_VIOLATION: &str = "23505";

/// Default Postgres implementation for the [`EventStore`]. Use this struct in order to have a
/// pre-made implementation of an [`EventStore`] persisting on Postgres.
///
/// Events of every stream live in a single `<prefix>_events` table with a unique constraint over
/// `(stream_id, stream_version)`, snapshots in `<prefix>_snapshots`.
///
/// The store is protected by an [`Arc`] that allows it to be cloneable still having the same memory
/// reference.
pub struct PgStore {
    pub(super) inner: Arc<InnerPgStore>,
}

pub(super) struct InnerPgStore {
    pub(super) pool: Pool<Postgres>,
    pub(super) statements: Statements,
}

impl PgStore {
    /// Returns the name of the events table
    pub fn events_table(&self) -> &str {
        self.inner.statements.events_table()
    }

    /// Returns the name of the snapshots table
    pub fn snapshots_table(&self) -> &str {
        self.inner.statements.snapshots_table()
    }

    /// Returns the inner pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.inner.pool
    }

    fn conflict_or(error: sqlx::Error, stream_id: &str, expected_version: StreamVersion) -> StoreError {
        match &error {
            sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::WrongExpectedVersion {
                    stream_id: stream_id.to_string(),
                    expected: expected_version,
                    actual: None,
                }
            }
            _ => StoreError::Sqlx(error),
        }
    }
}

#[async_trait]
impl EventStore for PgStore {
    #[tracing::instrument(skip_all, fields(stream_id = %stream_id, expected_version = expected_version), err)]
    async fn append_events(
        &self,
        stream_id: &str,
        expected_version: StreamVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError> {
        let mut transaction: Transaction<Postgres> = self.inner.pool.begin().await?;

        let actual: StreamVersion = sqlx::query_scalar::<_, StreamVersion>(self.inner.statements.select_stream_version())
            .bind(stream_id)
            .fetch_one(&mut *transaction)
            .await?;

        // Dropping the transaction rolls it back.
        if actual != expected_version {
            return Err(StoreError::WrongExpectedVersion {
                stream_id: stream_id.to_string(),
                expected: expected_version,
                actual: Some(actual),
            });
        }

        let recorded_at: DateTime<Utc> = Utc::now();
        let mut store_events: Vec<StoreEvent<Value>> = Vec::with_capacity(events.len());

        for (event, stream_version) in events.into_iter().zip(expected_version + 1..) {
            let id: Uuid = Uuid::new_v4();

            let _ = sqlx::query(self.inner.statements.insert_event())
                .bind(id)
                .bind(stream_id)
                .bind(stream_version)
                .bind(&event.event_type)
                .bind(Json(&event.data))
                .bind(recorded_at)
                .execute(&mut *transaction)
                .await
                .map_err(|error| Self::conflict_or(error, stream_id, expected_version))?;

            store_events.push(StoreEvent {
                id,
                stream_id: stream_id.to_string(),
                stream_version,
                event_type: event.event_type,
                payload: event.data,
                recorded_at,
            });
        }

        transaction
            .commit()
            .await
            .map_err(|error| Self::conflict_or(error, stream_id, expected_version))?;

        Ok(store_events)
    }

    async fn read_stream_forward(
        &self,
        stream_id: &str,
        from_version: StreamVersion,
        max_count: usize,
    ) -> Result<Vec<StoreEvent<Value>>, StoreError> {
        let limit: i64 = i64::try_from(max_count).unwrap_or(i64::MAX);

        Ok(sqlx::query_as::<_, DbEvent>(self.inner.statements.select_stream_forward())
            .bind(stream_id)
            .bind(from_version)
            .bind(limit)
            .fetch(&self.inner.pool)
            .map_ok(StoreEvent::from)
            .try_collect::<Vec<StoreEvent<Value>>>()
            .await?)
    }

    async fn stream_version(&self, stream_id: &str) -> Result<StreamVersion, StoreError> {
        Ok(sqlx::query_scalar::<_, StreamVersion>(self.inner.statements.select_stream_version())
            .bind(stream_id)
            .fetch_one(&self.inner.pool)
            .await?)
    }

    async fn get_latest_snapshot(&self, stream_id: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(sqlx::query_as::<_, DbSnapshot>(self.inner.statements.select_latest_snapshot())
            .bind(stream_id)
            .fetch_optional(&self.inner.pool)
            .await?
            .map(Snapshot::from))
    }

    #[tracing::instrument(skip_all, fields(stream_id = %stream_id, stream_version = stream_version), err)]
    async fn save_snapshot(
        &self,
        stream_id: &str,
        stream_version: StreamVersion,
        aggregate_type: &str,
        data: Value,
    ) -> Result<(), StoreError> {
        let _ = sqlx::query(self.inner.statements.insert_snapshot())
            .bind(stream_id)
            .bind(stream_version)
            .bind(aggregate_type)
            .bind(Json(&data))
            .bind(Utc::now())
            .execute(&self.inner.pool)
            .await?;

        Ok(())
    }
}

/// Debug implementation for [`PgStore`]. It just shows the statements, that are the only thing
/// that might be useful to debug.
impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("statements", &self.inner.statements)
            .finish()
    }
}

impl Clone for PgStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
