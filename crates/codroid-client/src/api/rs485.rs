//! RS485 serial port on the end effector.

use serde_json::json;

use codroid_protocol::routes::rs485 as routes;

use crate::api::{Reply, send_empty};
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::exchange::RequestOptions;
use crate::transport::Connector;

/// Default time the controller waits for serial data, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 3000;

/// Parity bit setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Odd => 1,
            Self::Even => 2,
        }
    }
}

impl TryFrom<u8> for Parity {
    type Error = ClientError;

    fn try_from(code: u8) -> ClientResult<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Odd),
            2 => Ok(Self::Even),
            other => Err(ClientError::invalid_argument(format!(
                "parity must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

/// Serial line settings for `EC2RS485/init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rs485Config {
    pub baud_rate: u32,
    pub stop_bit: u8,
    pub data_bit: u8,
    pub parity: Parity,
}

impl Default for Rs485Config {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            stop_bit: 1,
            data_bit: 8,
            parity: Parity::None,
        }
    }
}

/// Opens the serial port with `config`.
pub fn init<C: Connector>(
    conn: &mut Connection<C>,
    config: &Rs485Config,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    let payload = json!({
        "baud_rate": config.baud_rate,
        "stop_bit": config.stop_bit,
        "data_bit": config.data_bit,
        "parity": config.parity.code(),
    });
    conn.request(routes::INIT, payload, options)
}

/// Discards anything waiting in the controller's receive buffer.
pub fn flush_read_buffer<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::FLUSH_READ_BUFFER, options)
}

/// Reads up to `length` bytes, waiting at most `timeout_ms` on the controller.
///
/// The exchange deadline in `options` is separate and should be longer than
/// `timeout_ms`.
pub fn read<C: Connector>(
    conn: &mut Connection<C>,
    length: u32,
    timeout_ms: u32,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::READ,
        json!({ "length": length, "timeout": timeout_ms }),
        options,
    )
}

/// Writes raw bytes to the serial line.
pub fn write<C: Connector>(
    conn: &mut Connection<C>,
    data: &[u8],
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(routes::WRITE, json!(data), options)
}
