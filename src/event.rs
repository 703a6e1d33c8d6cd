use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Every aggregate event must be serializable and able to name itself.
///
/// The name is stored alongside the payload as the event type tag, so that the events table can be
/// inspected and filtered without deserializing payloads.
pub trait Event: Serialize + DeserializeOwned {
    /// Returns the type tag for this event.
    fn event_type(&self) -> &'static str;
}

/// An event payload ready to be appended to a stream. It has no version yet: the store assigns it
/// when the append succeeds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: String,
    pub data: serde_json::Value,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    /// Serializes a domain event into its weakly-typed stored form.
    ///
    /// # Errors
    ///
    /// Will return an `Err` if the event cannot be serialized to JSON.
    pub fn from_event<E: Event>(event: &E) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: serde_json::to_value(event)?,
        })
    }
}
