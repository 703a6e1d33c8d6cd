use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::FieldRestoration;
use crate::event::Event;

/// The Aggregate trait is responsible for validating commands, mapping commands to events, and applying
/// events onto the state.
///
/// An Aggregate should be able to derive its own state from nothing but its initial configuration, and its
/// event stream. Applying the same events, in the same order, to the same aggregate, should always yield an
/// identical aggregate state.
///
/// This trait is purposefully _synchronous_. If you are implementing this trait, your aggregate
/// should not have any side effects. Additionally, the decision function could be run more than
/// once for a single `execute` call, when a concurrent writer wins the race on the same stream.
pub trait Aggregate {
    /// Internal aggregate name. Stored on snapshots as the aggregate type tag, it should not
    /// change once snapshots have been written.
    const NAME: &'static str;

    /// Internal aggregate state. Snapshots round-trip it through a JSON object, so it must
    /// serialize to a map.
    type State: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// A command is an action that the caller can execute over an aggregate in order to let it emit
    /// events. Commands are cloned when a conflicting write forces the decision to be re-run.
    type Command: Clone + Send + Sync;

    /// An event represents a fact that took place in the domain. They are the source of truth;
    /// your application's state is built from events.
    type Event: Event + Send + Sync;

    /// This associated type is used to get domain errors while handling a command.
    type Error: std::error::Error + Send + Sync;

    /// The state of a stream that has no events yet.
    fn init() -> Self::State;

    /// Handles, validates a command and emits events.
    ///
    /// An empty vector is a valid answer: the command is accepted and nothing is appended.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the user of this library set up command validations. Every error here
    /// could be just a "domain error". No technical errors.
    fn handle_command(state: &Self::State, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Updates the aggregate state using the new event. This assumes that the event can be correctly applied
    /// to the state.
    ///
    /// If this is not the case, this function is allowed to panic.
    fn apply_event(state: Self::State, payload: &Self::Event) -> Self::State;

    /// Fields whose string values are restricted to a fixed set, restored to their canonical
    /// spelling when a snapshot is decoded.
    ///
    /// ```ignore
    /// const RESTORATIONS: &'static [FieldRestoration] = &[
    ///     FieldRestoration::new("status", &["open", "closed"]),
    ///     FieldRestoration::lenient("priority", &["low", "high"]),
    /// ];
    /// ```
    const RESTORATIONS: &'static [FieldRestoration] = &[];
}
