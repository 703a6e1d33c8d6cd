use serde::{Deserialize, Serialize};

use foldstore::codec::FieldRestoration;
use foldstore::Aggregate;
pub use structs::*;

mod structs;

pub struct Counter;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CounterStatus {
    Open,
    Closed,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CounterState {
    pub count: i64,
    pub status: CounterStatus,
}

impl Aggregate for Counter {
    const NAME: &'static str = "counter";
    type State = CounterState;
    type Command = TestCommand;
    type Event = TestEvent;
    type Error = TestError;

    fn init() -> Self::State {
        CounterState {
            count: 0,
            status: CounterStatus::Open,
        }
    }

    fn handle_command(state: &Self::State, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if state.status == CounterStatus::Closed {
            return Err(TestError::Closed);
        }

        match command {
            TestCommand::Increment { amount } if amount <= 0 => Err(TestError::InvalidAmount(amount)),
            TestCommand::Increment { amount } => Ok(vec![TestEvent::Incremented { amount }]),
            TestCommand::Touch => Ok(vec![]),
            TestCommand::Close => Ok(vec![TestEvent::Closed]),
        }
    }

    fn apply_event(state: Self::State, payload: &Self::Event) -> Self::State {
        match payload {
            TestEvent::Incremented { amount } => CounterState {
                count: state.count + amount,
                ..state
            },
            TestEvent::Closed => CounterState {
                status: CounterStatus::Closed,
                ..state
            },
        }
    }

    const RESTORATIONS: &'static [FieldRestoration] = &[FieldRestoration::lenient("status", &["open", "closed"])];
}
