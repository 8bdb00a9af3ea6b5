//! Connection lifecycle: connect, disconnect, and the state machine behind them.
//!
//! ```text
//!                 connect()              ok
//! Disconnected ─────────────► Connecting ────► Connected
//!      ▲                          │                │
//!      │      refused / timeout   │                │ I/O error during exchange
//!      ├──────────────────────────┘                ▼
//!      └────────────── disconnect() ───────────  Faulted
//! ```
//!
//! A `Connection` is owned by one caller and used from one thread at a time;
//! every mutating operation takes `&mut self`.

use std::fmt;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use codroid_core::{Event, NotificationSink, SubscriptionId};
use codroid_protocol::DEFAULT_MAX_READ_SIZE;

use crate::error::{ClientError, ClientResult};
use crate::transport::{Connector, TcpConnector, Transport};

/// Default controller port.
pub const DEFAULT_PORT: u16 = 9001;

/// Default connect and exchange timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Controller host name or IP address.
    pub host: String,

    /// Controller port.
    pub port: u16,

    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Default exchange timeout in milliseconds.
    pub exchange_timeout_ms: u64,

    /// Size of the single read performed for each reply.
    pub max_read_size: usize,

    /// Log raw request/reply text and emit `MessageSent` events.
    pub debug: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            exchange_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_read_size: DEFAULT_MAX_READ_SIZE,
            debug: false,
        }
    }
}

impl ConnectionSettings {
    /// Creates settings for the given host and port with default timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the default exchange timeout.
    #[must_use]
    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the reply read buffer size.
    #[must_use]
    pub fn with_max_read_size(mut self, size: usize) -> Self {
        self.max_read_size = size;
        self
    }

    /// Enables raw message logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the default exchange timeout.
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }

    /// Returns `host:port`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks the settings for values that can never work.
    pub fn validate(&self) -> ClientResult<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::Config("port must not be 0".into()));
        }
        if self.max_read_size == 0 {
            return Err(ClientError::Config("max_read_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport is held.
    Disconnected,
    /// A connect attempt is in progress.
    Connecting,
    /// A transport is held and usable.
    Connected,
    /// An I/O error released the transport; reconnect before further use.
    Faulted,
}

impl ConnectionState {
    /// Returns true if the connection must be re-established before use.
    pub fn needs_reconnect(self) -> bool {
        !matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// A session with one controller.
pub struct Connection<C: Connector = TcpConnector> {
    pub(crate) settings: ConnectionSettings,
    pub(crate) state: ConnectionState,
    pub(crate) transport: Option<C::Transport>,
    pub(crate) last_ok: bool,
    pub(crate) sink: NotificationSink,
    connector: C,
}

impl Connection<TcpConnector> {
    /// Creates a disconnected TCP connection.
    pub fn new(settings: ConnectionSettings) -> Self {
        Self::with_connector(settings, TcpConnector)
    }
}

impl<C: Connector> Connection<C> {
    /// Creates a disconnected connection using a custom connector.
    pub fn with_connector(settings: ConnectionSettings, connector: C) -> Self {
        Self {
            settings,
            state: ConnectionState::Disconnected,
            transport: None,
            last_ok: false,
            sink: NotificationSink::new(),
            connector,
        }
    }

    /// Returns the controller host.
    pub fn host(&self) -> &str {
        &self.settings.host
    }

    /// Returns the controller port.
    pub fn port(&self) -> u16 {
        self.settings.port
    }

    /// Returns the connection settings.
    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns whether the most recent connect or exchange succeeded.
    pub fn last_operation_succeeded(&self) -> bool {
        self.last_ok
    }

    /// Returns true if the connection is established and the transport is open.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
            && self.transport.as_ref().is_some_and(Transport::is_open)
    }

    /// Registers an event subscriber.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.sink.subscribe(subscriber)
    }

    /// Registers a channel receiving every event.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, mpsc::Receiver<Event>) {
        self.sink.subscribe_channel()
    }

    /// Removes an event subscriber.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.sink.unsubscribe(id)
    }

    /// Connects using the configured connect timeout.
    pub fn connect_default(&mut self) -> ClientResult<()> {
        let timeout = self.settings.connect_timeout();
        self.connect(timeout)
    }

    /// Connects to the controller, waiting at most `timeout`.
    ///
    /// An existing connection is closed first. Failures are not retried.
    /// Settings that can never work are rejected with [`ClientError::Config`]
    /// before any I/O.
    ///
    /// The host name is resolved with the system resolver before the
    /// deadline starts, so a slow DNS lookup is not bounded by `timeout`.
    /// Pass an IP address when the deadline must be strict.
    pub fn connect(&mut self, timeout: Duration) -> ClientResult<()> {
        if self.transport.is_some() || !self.state.needs_reconnect() {
            self.disconnect();
        }

        if let Err(err) = self.settings.validate() {
            self.state = ConnectionState::Disconnected;
            self.last_ok = false;
            self.sink.emit(Event::Error(err.to_string()));
            return Err(err);
        }

        let addr = self.settings.addr();
        self.state = ConnectionState::Connecting;
        debug!(addr = %addr, timeout_ms = timeout.as_millis() as u64, "connecting");

        match self
            .connector
            .connect(&self.settings.host, self.settings.port, timeout)
        {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = ConnectionState::Connected;
                self.last_ok = true;
                info!(addr = %addr, "connected to controller");
                self.sink.emit(Event::Connected);
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                self.last_ok = false;
                let err = classify_connect_error(addr, timeout, e);
                self.sink.emit(Event::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Closes the connection.
    ///
    /// Always ends Disconnected and always emits `Disconnected`, even when
    /// nothing was open. A failed shutdown is reported as an `Error` event.
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown() {
                self.sink
                    .emit(Event::Error(format!("error while disconnecting: {}", e)));
            }
            info!(addr = %self.settings.addr(), "disconnected from controller");
        }
        self.state = ConnectionState::Disconnected;
        self.sink.emit(Event::Disconnected);
    }

    /// Releases the transport after an I/O failure and reports `err`.
    pub(crate) fn fault(&mut self, err: &ClientError) {
        warn!(addr = %self.settings.addr(), error = %err, "connection faulted");
        if let Some(mut transport) = self.transport.take() {
            // The stream is already broken; a shutdown error adds nothing.
            let _ = transport.shutdown();
        }
        self.state = ConnectionState::Faulted;
        self.last_ok = false;
        self.sink.emit(Event::Error(err.to_string()));
    }
}

impl<C: Connector> Drop for Connection<C> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            self.disconnect();
        }
    }
}

impl<C: Connector> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.settings.addr())
            .field("state", &self.state)
            .field("last_ok", &self.last_ok)
            .field("sink", &self.sink)
            .finish()
    }
}

fn classify_connect_error(addr: String, timeout: Duration, err: io::Error) -> ClientError {
    if err.kind() == io::ErrorKind::TimedOut {
        ClientError::ConnectTimeout { addr, timeout }
    } else {
        ClientError::ConnectRefused { addr, source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnector, MockTransportState};
    use std::net::TcpListener;

    fn collect(rx: &mpsc::Receiver<Event>) -> Vec<Event> {
        rx.try_iter().collect()
    }

    #[test]
    fn settings_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.port, 9001);
        assert_eq!(settings.connect_timeout(), Duration::from_secs(5));
        assert_eq!(settings.exchange_timeout(), Duration::from_secs(5));
        assert_eq!(settings.max_read_size, 1024);
        assert!(!settings.debug);
        settings.validate().unwrap();
    }

    #[test]
    fn settings_validation() {
        assert!(ConnectionSettings::new("", 9001).validate().is_err());
        assert!(ConnectionSettings::new("robot", 0).validate().is_err());
        assert!(
            ConnectionSettings::new("robot", 9001)
                .with_max_read_size(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn new_connection_is_disconnected() {
        let conn = Connection::new(ConnectionSettings::new("10.0.0.2", 9001));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.is_connected());
        assert!(!conn.last_operation_succeeded());
        assert_eq!(conn.host(), "10.0.0.2");
        assert_eq!(conn.port(), 9001);
    }

    #[test]
    fn connect_success_emits_connected() {
        let state = MockTransportState::shared();
        let mut conn =
            Connection::with_connector(ConnectionSettings::default(), MockConnector::ok(&state));
        let (_id, rx) = conn.subscribe_channel();

        conn.connect(Duration::from_millis(100)).unwrap();

        assert!(conn.is_connected());
        assert!(conn.last_operation_succeeded());
        assert_eq!(collect(&rx), vec![Event::Connected]);
    }

    #[test]
    fn connect_timeout_is_classified() {
        let mut conn = Connection::with_connector(
            ConnectionSettings::default(),
            MockConnector::failing(io::ErrorKind::TimedOut),
        );
        let (_id, rx) = conn.subscribe_channel();

        let err = conn.connect(Duration::from_millis(100)).unwrap_err();

        assert!(matches!(err, ClientError::ConnectTimeout { .. }));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        let events = collect(&rx);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());
    }

    #[test]
    fn connect_rejects_zero_read_size_before_io() {
        let state = MockTransportState::shared();
        let mut conn = Connection::with_connector(
            ConnectionSettings::default().with_max_read_size(0),
            MockConnector::ok(&state),
        );
        let (_id, rx) = conn.subscribe_channel();

        let err = conn.connect(Duration::from_millis(100)).unwrap_err();

        assert!(matches!(err, ClientError::Config(ref m) if m.contains("max_read_size")));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(!conn.last_operation_succeeded());
        assert_eq!(state.lock().unwrap().connects, 0);
        let events = collect(&rx);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_error());

        let err = conn
            .exchange(1, "project/run", &serde_json::json!({}), Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        assert!(state.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn connect_rejects_empty_host() {
        let state = MockTransportState::shared();
        let mut conn =
            Connection::with_connector(ConnectionSettings::new(" ", 9001), MockConnector::ok(&state));

        let err = conn.connect(Duration::from_millis(100)).unwrap_err();

        assert!(matches!(err, ClientError::Config(_)));
        assert!(!conn.is_connected());
    }

    #[test]
    fn connect_refused_against_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut conn = Connection::new(ConnectionSettings::new("127.0.0.1", port));

        let err = conn.connect(Duration::from_secs(1)).unwrap_err();

        assert!(matches!(err, ClientError::ConnectRefused { .. }), "{err}");
        assert!(!conn.is_connected());
        assert!(!conn.last_operation_succeeded());
    }

    #[test]
    fn reconnect_closes_previous_transport() {
        let state = MockTransportState::shared();
        let mut conn =
            Connection::with_connector(ConnectionSettings::default(), MockConnector::ok(&state));
        let (_id, rx) = conn.subscribe_channel();

        conn.connect(Duration::from_millis(100)).unwrap();
        conn.connect(Duration::from_millis(100)).unwrap();

        assert_eq!(state.lock().unwrap().shutdowns, 1);
        assert_eq!(
            collect(&rx),
            vec![Event::Connected, Event::Disconnected, Event::Connected]
        );
    }

    #[test]
    fn disconnect_is_idempotent() {
        let state = MockTransportState::shared();
        let mut conn =
            Connection::with_connector(ConnectionSettings::default(), MockConnector::ok(&state));
        let (_id, rx) = conn.subscribe_channel();

        conn.disconnect();
        assert!(!conn.is_connected());
        conn.disconnect();
        assert!(!conn.is_connected());

        assert_eq!(collect(&rx), vec![Event::Disconnected, Event::Disconnected]);
        assert_eq!(state.lock().unwrap().shutdowns, 0);
    }

    #[test]
    fn disconnect_twice_after_connect_reports_no_error() {
        let state = MockTransportState::shared();
        let mut conn =
            Connection::with_connector(ConnectionSettings::default(), MockConnector::ok(&state));
        conn.connect(Duration::from_millis(100)).unwrap();
        let (_id, rx) = conn.subscribe_channel();

        conn.disconnect();
        conn.disconnect();

        let events = collect(&rx);
        assert!(events.iter().all(|e| !e.is_error()), "{events:?}");
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(state.lock().unwrap().shutdowns, 1);
    }

    #[test]
    fn disconnect_reports_shutdown_error_but_completes() {
        let state = MockTransportState::shared();
        state.lock().unwrap().fail_shutdown = true;
        let mut conn =
            Connection::with_connector(ConnectionSettings::default(), MockConnector::ok(&state));
        conn.connect(Duration::from_millis(100)).unwrap();
        let (_id, rx) = conn.subscribe_channel();

        conn.disconnect();

        let events = collect(&rx);
        assert!(events[0].is_error());
        assert_eq!(events[1], Event::Disconnected);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn closed_transport_is_not_connected() {
        let state = MockTransportState::shared();
        let mut conn =
            Connection::with_connector(ConnectionSettings::default(), MockConnector::ok(&state));
        conn.connect(Duration::from_millis(100)).unwrap();

        state.lock().unwrap().open = false;

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert!(!conn.is_connected());
    }

    #[test]
    fn drop_shuts_down_transport() {
        let state = MockTransportState::shared();
        {
            let mut conn = Connection::with_connector(
                ConnectionSettings::default(),
                MockConnector::ok(&state),
            );
            conn.connect(Duration::from_millis(100)).unwrap();
        }
        assert_eq!(state.lock().unwrap().shutdowns, 1);
    }
}
