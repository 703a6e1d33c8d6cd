//! Round-trips aggregate state through plain JSON objects.
//!
//! Snapshots are stored as string-keyed maps. Decoding merges the stored map over the encoded
//! initial state, so fields added after a snapshot was written take their initial value, and keys
//! the current code doesn't know survive in the merged map. Fields restricted to a fixed set of
//! values are then restored to their canonical spelling through an explicit allow-list, before the
//! typed state is deserialized.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::aggregate::Aggregate;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("state must be encoded as a JSON object, got `{0}`")]
    NotAnObject(Value),
}

/// Allow-list of the symbolic values a field can hold.
///
/// During decoding, every string found under a key named `field` (at any depth) that matches one
/// of `allowed` is rewritten to that exact spelling. Strings with no match are left untouched.
///
/// Matching is exact unless the restoration is built with [`FieldRestoration::lenient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRestoration {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
    pub lenient: bool,
}

impl FieldRestoration {
    pub const fn new(field: &'static str, allowed: &'static [&'static str]) -> Self {
        Self {
            field,
            allowed,
            lenient: false,
        }
    }

    /// Like [`FieldRestoration::new`], but also matches values differing in ASCII case or carrying a
    /// leading `:`, e.g. `"Closed"` and `":closed"` both restore to `"closed"`.
    pub const fn lenient(field: &'static str, allowed: &'static [&'static str]) -> Self {
        Self {
            field,
            allowed,
            lenient: true,
        }
    }

    /// Looks up the canonical spelling of `raw`.
    pub fn canonical(&self, raw: &str) -> Option<&'static str> {
        if let Some(exact) = self.allowed.iter().find(|allowed| **allowed == raw) {
            return Some(*exact);
        }

        if !self.lenient {
            return None;
        }

        let trimmed = raw.trim().trim_start_matches(':');
        self.allowed
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(trimmed))
            .copied()
    }
}

/// Encodes a state into a JSON object.
///
/// # Errors
///
/// Will return an `Err` if the state cannot be serialized, or doesn't serialize to an object.
pub fn encode<S: Serialize>(state: &S) -> Result<Value, CodecError> {
    match serde_json::to_value(state)? {
        value @ Value::Object(_) => Ok(value),
        other => Err(CodecError::NotAnObject(other)),
    }
}

/// Decodes a stored snapshot payload into the aggregate state, using [`Aggregate::init`] as the
/// structural base and [`Aggregate::RESTORATIONS`] to restore restricted fields.
///
/// # Errors
///
/// Will return an `Err` if the payload is not an object, or if the merged and restored value still
/// cannot be deserialized into the state type.
pub fn decode<A: Aggregate>(data: Value) -> Result<A::State, CodecError> {
    let stored = match data {
        Value::Object(map) => map,
        other => return Err(CodecError::NotAnObject(other)),
    };

    let mut merged: Map<String, Value> = match encode(&A::init())? {
        Value::Object(map) => map,
        other => return Err(CodecError::NotAnObject(other)),
    };
    merged.extend(stored);

    let mut value = Value::Object(merged);
    restore(&mut value, A::RESTORATIONS);

    from_value(value)
}

fn from_value<S: DeserializeOwned>(value: Value) -> Result<S, CodecError> {
    Ok(serde_json::from_value(value)?)
}

/// Recursively restores every field named in `restorations`, in place.
pub fn restore(value: &mut Value, restorations: &[FieldRestoration]) {
    if restorations.is_empty() {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, field_value) in map.iter_mut() {
                if let Some(restoration) = restorations.iter().find(|r| r.field == key.as_str()) {
                    restore_field(field_value, restoration);
                }
                restore(field_value, restorations);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| restore(item, restorations)),
        _ => (),
    }
}

fn restore_field(value: &mut Value, restoration: &FieldRestoration) {
    match value {
        Value::String(raw) => {
            if let Some(canonical) = restoration.canonical(raw) {
                *raw = canonical.to_string();
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| restore_field(item, restoration)),
        _ => (),
    }
}
