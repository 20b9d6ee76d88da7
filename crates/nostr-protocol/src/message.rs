//! Wire frames exchanged with relays.

use serde_json::{json, Value};

use crate::error::ShapeError;
use crate::event::Event;
use crate::filter::Filter;
use crate::Error;

/// Frames a client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Event(Event),
    Auth(Event),
    Req { sub_id: String, filters: Vec<Filter> },
    Close(String),
}

impl ClientMessage {
    pub fn req(sub_id: impl Into<String>, filters: Vec<Filter>) -> Self {
        Self::Req {
            sub_id: sub_id.into(),
            filters,
        }
    }

    pub fn close(sub_id: impl Into<String>) -> Self {
        Self::Close(sub_id.into())
    }

    pub fn as_value(&self) -> Result<Value, Error> {
        let value = match self {
            Self::Event(event) => json!(["EVENT", event]),
            Self::Auth(event) => json!(["AUTH", event]),
            Self::Req { sub_id, filters } => {
                let mut frame = vec![json!("REQ"), json!(sub_id)];
                for filter in filters {
                    frame.push(serde_json::to_value(filter)?);
                }
                Value::Array(frame)
            }
            Self::Close(sub_id) => json!(["CLOSE", sub_id]),
        };
        Ok(value)
    }

    pub fn to_frame(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.as_value()?)?)
    }
}

/// Frames a relay sends. Events are decoded through the shape boundary but
/// not yet verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessage {
    Event { sub_id: String, event: Box<Event> },
    EndOfStoredEvents(String),
    Notice(String),
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Auth { challenge: String },
    Closed { sub_id: String, message: String },
}

impl RelayMessage {
    pub fn from_json(json: &str) -> Result<Self, ShapeError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| ShapeError::field("frame", err.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ShapeError> {
        let Value::Array(mut parts) = value else {
            return Err(ShapeError::field("frame", "must be a list"));
        };
        if parts.is_empty() {
            return Err(ShapeError::field("frame", "is empty"));
        }
        let label = match parts.remove(0) {
            Value::String(label) => label,
            _ => return Err(ShapeError::field("frame", "label must be a string")),
        };

        match label.as_str() {
            "EVENT" => {
                let sub_id = string_at(&parts, 0, "sub_id")?;
                let event = parts
                    .get_mut(1)
                    .map(Value::take)
                    .ok_or_else(|| ShapeError::field("event", "missing"))?;
                Ok(Self::Event {
                    sub_id,
                    event: Box::new(Event::from_value(event)?),
                })
            }
            "EOSE" => Ok(Self::EndOfStoredEvents(string_at(&parts, 0, "sub_id")?)),
            "NOTICE" => Ok(Self::Notice(string_at(&parts, 0, "message")?)),
            "OK" => Ok(Self::Ok {
                event_id: string_at(&parts, 0, "event_id")?,
                accepted: parts
                    .get(1)
                    .and_then(Value::as_bool)
                    .ok_or_else(|| ShapeError::field("accepted", "must be a boolean"))?,
                message: optional_string_at(&parts, 2),
            }),
            "AUTH" => Ok(Self::Auth {
                challenge: string_at(&parts, 0, "challenge")?,
            }),
            "CLOSED" => Ok(Self::Closed {
                sub_id: string_at(&parts, 0, "sub_id")?,
                message: optional_string_at(&parts, 1),
            }),
            other => Err(ShapeError::field(
                "frame",
                format!("unknown label '{other}'"),
            )),
        }
    }
}

fn string_at(parts: &[Value], index: usize, field: &'static str) -> Result<String, ShapeError> {
    parts
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ShapeError::field(field, "must be a string"))
}

fn optional_string_at(parts: &[Value], index: usize) -> String {
    parts
        .get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
