use crate::store::StoreEvent;
use crate::types::StreamVersion;

/// The internal state for an Aggregate, as loaded from a stream.
///
/// It contains:
/// - the stream the state was loaded from,
/// - the version of the last event folded into it,
/// - the inner state, as defined by the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateState<S> {
    stream_id: String,
    version: StreamVersion,
    inner: S,
}

impl<S> AggregateState<S> {
    /// Creates a state for the given stream at the given version.
    pub fn new(stream_id: impl Into<String>, version: StreamVersion, inner: S) -> Self {
        Self {
            stream_id: stream_id.into(),
            version,
            inner,
        }
    }

    /// Returns the stream this state belongs to.
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Returns the version of the last event applied to this state, `0` for an empty stream.
    pub fn version(&self) -> StreamVersion {
        self.version
    }

    /// Returns an immutable reference to the inner state.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Consumes the aggregate state and returns the inner state.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Folds the given store events onto the inner state, in order. The version ends up being the
    /// version of the last event, or stays unchanged if there are none.
    pub fn apply_store_events<'a, E, F>(
        self,
        store_events: impl IntoIterator<Item = &'a StoreEvent<E>>,
        function: F,
    ) -> Self
    where
        E: 'a,
        F: Fn(S, &E) -> S,
    {
        store_events.into_iter().fold(self, |mut state, store_event| {
            state.inner = function(state.inner, store_event.payload());
            state.version = store_event.stream_version;
            state
        })
    }
}
