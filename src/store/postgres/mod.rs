pub use builder::*;
pub use event_store::*;
pub use params::*;

mod builder;
mod event;
mod event_store;
mod params;
mod statements;
