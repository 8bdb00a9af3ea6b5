//! Typed wrappers for the controller's routes.
//!
//! Each function only shapes a payload and hands it to
//! [`Connection::request`](crate::Connection::request); none of them add
//! protocol behaviour. All of them return the parsed reply object.
//!
//! ```ignore
//! use codroid_client::{api, Connection, ConnectionSettings, RequestOptions};
//!
//! let mut conn = Connection::new(ConnectionSettings::new("192.168.1.136", 9001));
//! conn.connect_default()?;
//! let reply = api::project::run(&mut conn, "mhv9ubqz0pr69d5f", &RequestOptions::default())?;
//! ```

pub mod modbus;
pub mod project;
pub mod robot;
pub mod rs485;
pub mod vars;

use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::error::ClientResult;
use crate::exchange::RequestOptions;
use crate::transport::Connector;

/// Parsed reply object returned by every route wrapper.
pub type Reply = Map<String, Value>;

/// Sends a route whose payload is an empty object.
pub(crate) fn send_empty<C: Connector>(
    conn: &mut Connection<C>,
    route: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(route, Value::Object(Map::new()), options)
}
