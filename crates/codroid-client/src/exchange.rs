//! The request/reply exchange over an established connection.
//!
//! One exchange is one blocking write of an encoded envelope followed by one
//! blocking read of the reply. Replies are matched to requests only by
//! ordering: the controller is assumed to answer each request exactly once
//! before the next is sent, and the `id` it echoes back is never compared
//! with the one that was sent. There is no pipelining and no correlation.

use std::io;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use codroid_core::Event;
use codroid_protocol::{ReplyView, decode_reply, encode_request, parse_reply_object};

use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::transport::{Connector, Transport, is_timeout};

/// Default request id when the caller has no reason to pick one.
pub const DEFAULT_REQUEST_ID: i64 = 1;

/// Per-call options for command functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Value sent in the envelope's `id` field.
    pub id: i64,
    /// Reply deadline; `None` uses the connection's exchange timeout.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            id: DEFAULT_REQUEST_ID,
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// Sets the request id.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Sets the reply deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<C: Connector> Connection<C> {
    /// Sends one request and returns the raw reply text.
    ///
    /// Fails fast with [`ClientError::NotConnected`] without touching the
    /// transport when the connection is not established. Any write or read
    /// failure, including a timeout, faults the connection: the transport is
    /// released and the caller must reconnect.
    ///
    /// The reply is returned verbatim; use [`Connection::request`] to get a
    /// parsed object.
    pub fn exchange(
        &mut self,
        id: i64,
        route: &str,
        payload: &Value,
        timeout: Duration,
    ) -> ClientResult<String> {
        if !self.is_connected() {
            self.last_ok = false;
            let err = ClientError::NotConnected;
            self.sink.emit(Event::Error(format!("{err}, cannot send {route}")));
            return Err(err);
        }

        let bytes = match encode_request(id, route, payload.clone()) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.last_ok = false;
                let err = ClientError::from(e);
                self.sink.emit(Event::Error(err.to_string()));
                return Err(err);
            }
        };

        if self.settings.debug {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            debug!(route, id, message = %text, "sending request");
            self.sink.emit(Event::MessageSent(text));
        }

        let reply = match self.write_then_read(&bytes, timeout) {
            Ok(reply) => reply,
            Err(err) if err.faults_connection() => {
                self.fault(&err);
                return Err(err);
            }
            Err(err) => {
                self.last_ok = false;
                self.sink.emit(Event::Error(err.to_string()));
                return Err(err);
            }
        };

        let text = decode_reply(&reply);
        if self.settings.debug {
            debug!(route, id, message = %text, "received reply");
        } else {
            trace!(route, id, bytes = reply.len(), "received reply");
        }
        self.last_ok = true;
        self.sink.emit(Event::MessageReceived(text.clone()));
        Ok(text)
    }

    /// Sends one request and parses the reply as a JSON object.
    ///
    /// An unparseable reply is reported as [`ClientError::InvalidReply`]; the
    /// stream itself is intact, so the connection stays established.
    pub fn request(
        &mut self,
        route: &str,
        payload: Value,
        options: &RequestOptions,
    ) -> ClientResult<Map<String, Value>> {
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.settings.exchange_timeout());
        let text = self.exchange(options.id, route, &payload, timeout)?;

        let reply = parse_reply_object(&text).map_err(|e| {
            self.last_ok = false;
            let err = ClientError::from(e);
            self.sink.emit(Event::Error(format!("{route}: {err}")));
            err
        })?;
        if ReplyView::from_object(&reply).is_error() {
            debug!(route, "controller reported an error");
        }
        Ok(reply)
    }

    fn write_then_read(&mut self, bytes: &[u8], timeout: Duration) -> ClientResult<Vec<u8>> {
        let max_read_size = self.settings.max_read_size;
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;

        transport
            .write_all(bytes, timeout)
            .map_err(ClientError::WriteFailure)?;

        let mut buf = vec![0u8; max_read_size];
        let n = match transport.read(&mut buf, timeout) {
            Ok(0) => {
                return Err(ClientError::ReadFailure(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by controller",
                )));
            }
            Ok(n) => n,
            Err(e) if is_timeout(&e) => return Err(ClientError::ReadTimeout { timeout }),
            Err(e) => return Err(ClientError::ReadFailure(e)),
        };

        if n == max_read_size {
            debug!(bytes = n, "reply filled the read buffer and may be truncated");
        }
        buf.truncate(n);
        Ok(buf)
    }
}
