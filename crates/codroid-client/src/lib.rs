//! Client for the Codroid robot controller.
//!
//! A [`Connection`] owns one TCP stream to the controller and performs
//! blocking request/reply exchanges over it. The [`api`] module wraps each
//! controller route in a typed function; [`cli`] and [`commands`] implement
//! the `codroid` command-line tool on top.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use codroid_client::{Connection, ConnectionSettings, RequestOptions, api};
//!
//! # fn main() -> codroid_client::ClientResult<()> {
//! let mut conn = Connection::new(ConnectionSettings::new("192.168.1.136", 9001));
//! conn.connect(Duration::from_secs(2))?;
//!
//! let reply = api::robot::switch_on(&mut conn, &RequestOptions::default())?;
//! println!("{reply:?}");
//!
//! conn.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod transport;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionSettings, ConnectionState};
pub use error::{ClientError, ClientResult};
pub use exchange::RequestOptions;
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
