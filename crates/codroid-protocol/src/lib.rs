//! JSON envelope codec and route names for the Codroid controller protocol.
//!
//! # Protocol Overview
//!
//! The controller speaks plain JSON over a TCP byte stream. There is no
//! delimiter and no length prefix: one socket write carries one request and
//! one socket read carries one reply.
//!
//! # Envelope Structure
//!
//! Every request is wrapped in an [`Envelope`] with three keys, always
//! emitted in this order:
//! - `id`: caller-chosen integer tag (never checked against the reply)
//! - `ty`: the route, e.g. `project/run`
//! - `db`: the route-specific payload
//!
//! # Example
//!
//! ```rust
//! use codroid_protocol::{encode_request, parse_reply_object};
//! use serde_json::json;
//!
//! let bytes = encode_request(7, "project/run", json!({"id": "p1"})).unwrap();
//! assert_eq!(bytes, br#"{"id":7,"ty":"project/run","db":{"id":"p1"}}"#);
//!
//! let reply = parse_reply_object(r#"{"ty":"project/run","db":true}"#).unwrap();
//! assert_eq!(reply["db"], json!(true));
//! ```

mod codec;
mod error;
pub mod routes;
mod types;

pub use codec::{decode_reply, encode_envelope, encode_request, parse_reply_object};
pub use error::{ProtocolError, ProtocolResult};
pub use types::{Envelope, ReplyView};

/// Wire key carrying the request id.
pub const ID_KEY: &str = "id";

/// Wire key carrying the route.
pub const ROUTE_KEY: &str = "ty";

/// Wire key carrying the payload.
pub const PAYLOAD_KEY: &str = "db";

/// Wire key the controller uses to report a command error in a reply.
pub const ERROR_KEY: &str = "err";

/// Default size of the single read performed per exchange (1 KiB).
///
/// Replies longer than this are truncated: the protocol has no framing to
/// reassemble them.
pub const DEFAULT_MAX_READ_SIZE: usize = 1024;
