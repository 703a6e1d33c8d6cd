use serde::{Deserialize, Serialize};

use foldstore::event::Event;

#[derive(Clone, Debug)]
pub enum TestCommand {
    Increment { amount: i64 },
    Touch,
    Close,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestEvent {
    Incremented { amount: i64 },
    Closed,
}

impl Event for TestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Incremented { .. } => "incremented",
            Self::Closed => "closed",
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TestError {
    #[error("counter is closed")]
    Closed,
    #[error("invalid amount {0}")]
    InvalidAmount(i64),
}
