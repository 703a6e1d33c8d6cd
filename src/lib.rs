//! Event-sourced persistence: an append-only event store with optimistic concurrency control,
//! periodic state snapshots, and a stateless [`AggregateManager`] that loads aggregate state from a
//! stream and executes commands against it.

pub use crate::aggregate::Aggregate;
pub use crate::manager::{AggregateManager, Executed, ManagerError};
pub use crate::state::AggregateState;

mod aggregate;
pub mod codec;
pub mod event;
mod manager;
pub mod policy;
mod state;
pub mod store;
pub mod types;
