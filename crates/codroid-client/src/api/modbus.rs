//! Modbus TCP master: devices, polling tables and values.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use codroid_protocol::routes::modbus_tcp as routes;

use crate::api::{Reply, send_empty};
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::exchange::RequestOptions;
use crate::transport::Connector;

/// Function codes the controller can poll or write.
pub const SUPPORTED_FUNCTION_CODES: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0F, 0x10];

/// Default polling period of a table, in milliseconds.
pub const DEFAULT_PERIOD_MS: u32 = 1000;

/// Register byte order of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

impl Endian {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::Big => 1,
            Self::Little => 2,
        }
    }
}

/// How the controller interprets a run of holding or input registers.
///
/// Registers are `U16` until told otherwise. Only tables using function
/// codes 0x03, 0x04, 0x06 and 0x10 honor the type, and a 0x06 table holds a
/// single register so it can only be `I16` or `U16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModbusDataType {
    I16,
    #[default]
    U16,
    I32,
    U32,
    F32,
}

impl ModbusDataType {
    pub const ALL: [Self; 5] = [Self::I16, Self::U16, Self::I32, Self::U32, Self::F32];

    /// Name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::F32 => "float32",
        }
    }

    /// Number of 16-bit registers one value occupies.
    pub fn registers(self) -> u16 {
        match self {
            Self::I16 | Self::U16 => 1,
            Self::I32 | Self::U32 | Self::F32 => 2,
        }
    }
}

impl fmt::Display for ModbusDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for ModbusDataType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| {
                t.wire_name().eq_ignore_ascii_case(s) || format!("{t:?}").eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| {
                ClientError::invalid_argument(format!("unknown Modbus data type {s:?}"))
            })
    }
}

/// A Modbus TCP slave the controller connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusDevice {
    /// Unique device name.
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub slave_id: u8,
    pub endian: Endian,
}

impl ModbusDevice {
    pub fn new(name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            port,
            slave_id: 1,
            endian: Endian::Big,
        }
    }

    #[must_use]
    pub fn with_slave_id(mut self, slave_id: u8) -> Self {
        self.slave_id = slave_id;
        self
    }

    #[must_use]
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }
}

/// A polled address range on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusTable {
    pub device: String,
    /// Table name, unique per device.
    pub table: String,
    pub function_code: u8,
    pub address: u16,
    pub count: u16,
    pub period_ms: u32,
}

impl ModbusTable {
    pub fn new(
        device: impl Into<String>,
        table: impl Into<String>,
        function_code: u8,
        address: u16,
        count: u16,
    ) -> Self {
        Self {
            device: device.into(),
            table: table.into(),
            function_code,
            address,
            count,
            period_ms: DEFAULT_PERIOD_MS,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period_ms: u32) -> Self {
        self.period_ms = period_ms;
        self
    }
}

fn check_function_code(code: u8) -> ClientResult<()> {
    if SUPPORTED_FUNCTION_CODES.contains(&code) {
        Ok(())
    } else {
        Err(ClientError::invalid_argument(format!(
            "unsupported Modbus function code {code:#04x}"
        )))
    }
}

/// Registers or replaces a device.
pub fn set_device<C: Connector>(
    conn: &mut Connection<C>,
    device: &ModbusDevice,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    let payload = json!({
        "name": device.name,
        "ip": device.ip,
        "port": device.port,
        "slavedId": device.slave_id,
        "endian": device.endian.code(),
    });
    conn.request(routes::SET_DEVICE, payload, options)
}

/// Removes a device and its tables.
pub fn remove_device<C: Connector>(
    conn: &mut Connection<C>,
    name: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(routes::REMOVE_DEVICE, json!({ "name": name }), options)
}

/// Creates or replaces a polling table.
pub fn set_table<C: Connector>(
    conn: &mut Connection<C>,
    table: &ModbusTable,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    check_function_code(table.function_code)?;
    let payload = json!({
        "name": table.device,
        "tableName": table.table,
        "functionCode": table.function_code,
        "addr": table.address,
        "count": table.count,
        "period": table.period_ms,
    });
    conn.request(routes::SET_TABLE, payload, options)
}

/// Removes a polling table.
pub fn remove_table<C: Connector>(
    conn: &mut Connection<C>,
    device: &str,
    table: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::REMOVE_TABLE,
        json!({ "name": device, "tableName": table }),
        options,
    )
}

/// Changes how often a table is polled.
pub fn set_period<C: Connector>(
    conn: &mut Connection<C>,
    device: &str,
    table: &str,
    period_ms: u32,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::SET_PERIOD,
        json!({ "name": device, "tableName": table, "period": period_ms }),
        options,
    )
}

/// Gives the register at `address` a name scripts can use as `ModbusTCP["alias"]`.
pub fn set_alias<C: Connector>(
    conn: &mut Connection<C>,
    device: &str,
    table: &str,
    address: u16,
    alias: &str,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    if alias.trim().is_empty() {
        return Err(ClientError::invalid_argument("alias must not be empty"));
    }
    conn.request(
        routes::SET_NAME,
        json!({ "name": device, "tableName": table, "addr": address, "aliasName": alias }),
        options,
    )
}

/// Sets the data type of `count` registers starting at `address`.
///
/// `count` is a register count and must hold a whole number of values, so
/// four registers make two `U32` values.
pub fn set_data_type<C: Connector>(
    conn: &mut Connection<C>,
    device: &str,
    table: &str,
    address: u16,
    data_type: ModbusDataType,
    count: u16,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    if count == 0 || count % data_type.registers() != 0 {
        return Err(ClientError::invalid_argument(format!(
            "{count} registers do not hold a whole number of {data_type} values"
        )));
    }
    conn.request(
        routes::SET_TYPE,
        json!({
            "name": device,
            "tableName": table,
            "type": data_type.wire_name(),
            "addr": address,
            "count": count,
        }),
        options,
    )
}

/// Writes a value at `address` of a write table.
pub fn set_value<C: Connector>(
    conn: &mut Connection<C>,
    device: &str,
    table: &str,
    address: u16,
    value: i64,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    conn.request(
        routes::SET_VALUE,
        json!({ "name": device, "tableName": table, "addr": address, "val": value }),
        options,
    )
}

/// Reads the configuration of every device.
pub fn get_config<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::GET_CONFIG, options)
}

/// Reads the connection state of every device.
pub fn get_state<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::GET_STATE, options)
}
