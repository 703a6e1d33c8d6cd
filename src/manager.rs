use std::marker::PhantomData;

use crate::codec::{self, CodecError};
use crate::event::NewEvent;
use crate::policy::SnapshotPolicy;
use crate::store::{EventStore, StoreError, StoreEvent};
use crate::types::StreamVersion;
use crate::{Aggregate, AggregateState};

/// Errors returned by the [`AggregateManager`].
#[derive(thiserror::Error, Debug)]
pub enum ManagerError<E> {
    /// The aggregate rejected the command. Nothing has been appended.
    #[error("command rejected: {0}")]
    Domain(E),
    /// Every attempt lost the race against a concurrent writer on the same stream.
    #[error("conflicting writes on stream `{stream_id}` after {attempts} attempts")]
    Conflict { stream_id: String, attempts: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A domain event could not be serialized or a stored one deserialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// The outcome of a successful [`AggregateManager::execute`].
#[derive(Debug, Clone)]
pub struct Executed<S, E> {
    /// The state after the appended events have been applied.
    pub state: AggregateState<S>,
    /// The appended events, empty if the command was accepted as a no-op.
    pub events: Vec<StoreEvent<E>>,
}

/// The AggregateManager is responsible for coupling the Aggregate with a Store, so that the events
/// can be persisted when handled, and the state can be reconstructed by loading the latest snapshot
/// and applying the events that follow it.
///
/// It holds no state between calls: any number of callers can share it, for the same or different
/// streams. Writers on the same stream are serialized by the store alone.
///
/// The basic APIs are:
/// 1. execute
/// 2. load
pub struct AggregateManager<A, E>
where
    A: Aggregate,
    E: EventStore,
{
    event_store: E,
    snapshot_policy: SnapshotPolicy,
    max_attempts: usize,
    page_size: usize,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, E> AggregateManager<A, E>
where
    A: Aggregate,
    E: EventStore,
{
    pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
    pub const DEFAULT_PAGE_SIZE: usize = 10_000;

    /// Creates a new instance of an [`AggregateManager`], with the default snapshot policy.
    pub fn new(event_store: E) -> Self {
        Self {
            event_store,
            snapshot_policy: SnapshotPolicy::default(),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            page_size: Self::DEFAULT_PAGE_SIZE,
            _aggregate: PhantomData,
        }
    }

    /// Set the policy deciding when snapshots are taken after an append.
    pub fn with_snapshot_policy(mut self, snapshot_policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = snapshot_policy;
        self
    }

    /// Set how many times a command is decided and appended before giving up on a contended stream.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set how many events are read from the store at once while replaying a stream.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Loads the state of a stream: starts from its latest snapshot, if there is a usable one, and
    /// applies every following event by order of their version.
    ///
    /// An empty stream loads as [`Aggregate::init`] at version `0`.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if the store fails or a stored event doesn't deserialize.
    #[tracing::instrument(skip_all, fields(aggregate = A::NAME, stream_id = %stream_id), err)]
    pub async fn load(&self, stream_id: &str) -> Result<AggregateState<A::State>, ManagerError<A::Error>> {
        let aggregate_state = self.load_snapshot(stream_id).await?;
        self.replay(aggregate_state).await
    }

    /// Handles the command against the current state of the stream and appends the resulting events,
    /// guarded by the version the decision was taken on.
    ///
    /// When a concurrent writer appended in between, the state is loaded again and the command
    /// decided again, up to the configured number of attempts. Domain rejections are never retried.
    ///
    /// # Errors
    ///
    /// Will return [`ManagerError::Domain`] if the aggregate rejects the command,
    /// [`ManagerError::Conflict`] if every attempt hit a concurrent write, or any store error.
    #[tracing::instrument(skip_all, fields(aggregate = A::NAME, stream_id = %stream_id), err)]
    pub async fn execute(
        &self,
        stream_id: &str,
        command: A::Command,
    ) -> Result<Executed<A::State, A::Event>, ManagerError<A::Error>> {
        let mut attempts: usize = 0;

        loop {
            attempts += 1;

            let aggregate_state = self.load(stream_id).await?;
            let events: Vec<A::Event> =
                A::handle_command(aggregate_state.inner(), command.clone()).map_err(ManagerError::Domain)?;

            if events.is_empty() {
                return Ok(Executed {
                    state: aggregate_state,
                    events: vec![],
                });
            }

            let new_events: Vec<NewEvent> = events
                .iter()
                .map(NewEvent::from_event)
                .collect::<Result<_, _>>()?;

            let expected_version = aggregate_state.version();
            match self
                .event_store
                .append_events(stream_id, expected_version, new_events)
                .await
            {
                Ok(stored) => {
                    let store_events: Vec<StoreEvent<A::Event>> = stored
                        .into_iter()
                        .zip(events)
                        .map(|(stored, payload)| StoreEvent {
                            id: stored.id,
                            stream_id: stored.stream_id,
                            stream_version: stored.stream_version,
                            event_type: stored.event_type,
                            payload,
                            recorded_at: stored.recorded_at,
                        })
                        .collect();

                    let aggregate_state = aggregate_state.apply_store_events(&store_events, A::apply_event);

                    if self
                        .snapshot_policy
                        .should_snapshot(expected_version, aggregate_state.version())
                    {
                        // The events are already durable: a failed snapshot only costs a longer replay.
                        if let Err(error) = self.save_snapshot(&aggregate_state).await {
                            tracing::warn!({
                                aggregate = A::NAME,
                                stream_id = %stream_id,
                                stream_version = aggregate_state.version(),
                                error = ?error,
                            }, "failed to save snapshot");
                        }
                    }

                    return Ok(Executed {
                        state: aggregate_state,
                        events: store_events,
                    });
                }
                Err(error) if error.is_wrong_expected_version() => {
                    if attempts >= self.max_attempts {
                        return Err(ManagerError::Conflict {
                            stream_id: stream_id.to_string(),
                            attempts,
                        });
                    }

                    tracing::debug!({
                        aggregate = A::NAME,
                        stream_id = %stream_id,
                        expected_version = expected_version,
                        attempts = attempts,
                    }, "concurrent write detected, retrying command");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Loads the stream and saves a snapshot at its current version. Returns that version.
    ///
    /// Nothing is saved for an empty stream.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if loading fails, the state doesn't encode, or the store fails to save.
    pub async fn snapshot(&self, stream_id: &str) -> Result<StreamVersion, ManagerError<A::Error>> {
        let aggregate_state = self.load(stream_id).await?;

        if aggregate_state.version() > 0 {
            self.save_snapshot(&aggregate_state).await?;
        }

        Ok(aggregate_state.version())
    }

    /// Returns the internal event store
    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    async fn save_snapshot(&self, aggregate_state: &AggregateState<A::State>) -> Result<(), ManagerError<A::Error>> {
        let data = codec::encode(aggregate_state.inner())?;

        self.event_store
            .save_snapshot(aggregate_state.stream_id(), aggregate_state.version(), A::NAME, data)
            .await?;

        Ok(())
    }

    async fn load_snapshot(&self, stream_id: &str) -> Result<AggregateState<A::State>, ManagerError<A::Error>> {
        let initial = || AggregateState::new(stream_id, 0, A::init());

        let snapshot = match self.event_store.get_latest_snapshot(stream_id).await? {
            Some(snapshot) => snapshot,
            None => return Ok(initial()),
        };

        if snapshot.aggregate_type != A::NAME {
            tracing::warn!({
                aggregate = A::NAME,
                stream_id = %stream_id,
                snapshot_aggregate = %snapshot.aggregate_type,
            }, "ignoring snapshot of another aggregate type");

            return Ok(initial());
        }

        match codec::decode::<A>(snapshot.data) {
            Ok(inner) => Ok(AggregateState::new(stream_id, snapshot.stream_version, inner)),
            Err(error) => {
                tracing::warn!({
                    aggregate = A::NAME,
                    stream_id = %stream_id,
                    stream_version = snapshot.stream_version,
                    error = ?error,
                }, "ignoring undecodable snapshot, replaying stream from the start");

                Ok(initial())
            }
        }
    }

    async fn replay(
        &self,
        mut aggregate_state: AggregateState<A::State>,
    ) -> Result<AggregateState<A::State>, ManagerError<A::Error>> {
        loop {
            let page = self
                .event_store
                .read_stream_forward(aggregate_state.stream_id(), aggregate_state.version() + 1, self.page_size)
                .await?;

            let is_last_page = page.len() < self.page_size;

            let store_events: Vec<StoreEvent<A::Event>> = page
                .into_iter()
                .map(|store_event| store_event.deserialize())
                .collect::<Result<_, _>>()?;

            aggregate_state = aggregate_state.apply_store_events(&store_events, A::apply_event);

            if is_last_page {
                return Ok(aggregate_state);
            }
        }
    }
}
