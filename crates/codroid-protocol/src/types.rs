//! Request envelope and reply view types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ERROR_KEY, ID_KEY, PAYLOAD_KEY, ROUTE_KEY};

/// Request envelope sent to the controller.
///
/// Field order is the wire order: `id`, `ty`, `db`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Caller-chosen correlation tag. The controller echoes it, but nothing
    /// checks the echo: replies are matched to requests purely by ordering.
    pub id: i64,
    /// Slash-delimited command name, e.g. `project/run`.
    #[serde(rename = "ty")]
    pub route: String,
    /// Route-specific payload.
    #[serde(rename = "db")]
    pub payload: Value,
}

impl Envelope {
    /// Creates a new envelope.
    pub fn new(id: i64, route: impl Into<String>, payload: Value) -> Self {
        Self {
            id,
            route: route.into(),
            payload,
        }
    }
}

/// Borrowed view over the well-known keys of a parsed reply.
///
/// Every key is optional: the controller omits `err` on success and some
/// routes reply without `db`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplyView<'a> {
    pub id: Option<&'a Value>,
    pub route: Option<&'a str>,
    pub payload: Option<&'a Value>,
    pub error: Option<&'a Value>,
}

impl<'a> ReplyView<'a> {
    /// Builds a view over a reply object.
    pub fn from_object(reply: &'a Map<String, Value>) -> Self {
        Self {
            id: reply.get(ID_KEY),
            route: reply.get(ROUTE_KEY).and_then(Value::as_str),
            payload: reply.get(PAYLOAD_KEY),
            error: reply.get(ERROR_KEY).filter(|v| !v.is_null()),
        }
    }

    /// Returns true if the controller reported an error for this command.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
