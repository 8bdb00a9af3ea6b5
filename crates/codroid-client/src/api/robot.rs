//! Robot power and operating mode.

use codroid_protocol::routes::robot as routes;

use crate::api::{Reply, send_empty};
use crate::connection::Connection;
use crate::error::ClientResult;
use crate::exchange::RequestOptions;
use crate::transport::Connector;

/// Powers the arm on.
pub fn switch_on<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::SWITCH_ON, options)
}

/// Powers the arm off.
pub fn switch_off<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::SWITCH_OFF, options)
}

/// Switches to manual mode.
pub fn to_manual<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::TO_MANUAL, options)
}

/// Switches to automatic mode.
pub fn to_auto<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::TO_AUTO, options)
}

/// Switches to remote mode.
pub fn to_remote<C: Connector>(
    conn: &mut Connection<C>,
    options: &RequestOptions,
) -> ClientResult<Reply> {
    send_empty(conn, routes::TO_REMOTE, options)
}
