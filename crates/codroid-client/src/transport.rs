//! Byte transport under a [`Connection`](crate::Connection).
//!
//! The production implementation is a blocking [`TcpStream`]. The traits
//! exist so the connection state machine can be driven by an in-memory
//! transport in tests.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::debug;

/// Smallest deadline handed to the socket; a zero timeout means "block
/// forever" to the OS and is never what a caller asked for.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

/// An open, bidirectional byte stream.
pub trait Transport: Send {
    /// Writes all of `data`, giving up after `timeout`.
    fn write_all(&mut self, data: &[u8], timeout: Duration) -> io::Result<()>;

    /// Performs one read into `buf`, giving up after `timeout`.
    ///
    /// Returns the number of bytes read; `0` means the peer closed the stream.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Reports whether the stream is still open, without doing stream I/O.
    fn is_open(&self) -> bool;

    /// Closes both directions of the stream.
    fn shutdown(&mut self) -> io::Result<()>;
}

/// Opens transports to a host and port.
pub trait Connector {
    type Transport: Transport;

    /// Opens a transport, failing with [`io::ErrorKind::TimedOut`] if the
    /// attempt does not complete within `timeout`.
    fn connect(&self, host: &str, port: u16, timeout: Duration) -> io::Result<Self::Transport>;
}

/// Connector producing blocking TCP streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&self, host: &str, port: u16, timeout: Duration) -> io::Result<TcpTransport> {
        let deadline = Instant::now() + timeout;
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();

        let mut last_error = None;
        for addr in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::ErrorKind::TimedOut.into());
            }

            debug!(%addr, timeout_ms = remaining.as_millis() as u64, "opening TCP stream");
            match TcpStream::connect_timeout(&addr, remaining.max(MIN_SOCKET_TIMEOUT)) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    let transport = TcpTransport::new(stream);
                    debug!(peer = ?transport.peer_addr(), "TCP stream open");
                    return Ok(transport);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{host}:{port} did not resolve to any address"),
            )
        }))
    }
}

/// Blocking TCP stream with per-call deadlines.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    open: bool,
}

impl TcpTransport {
    /// Wraps an already connected stream.
    pub fn new(stream: TcpStream) -> Self {
        Self { stream, open: true }
    }

    /// Returns the remote address, if the socket still knows it.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

impl Transport for TcpTransport {
    fn write_all(&mut self, data: &[u8], timeout: Duration) -> io::Result<()> {
        self.stream
            .set_write_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.stream
            .set_read_timeout(Some(timeout.max(MIN_SOCKET_TIMEOUT)))?;
        self.stream.read(buf)
    }

    fn is_open(&self) -> bool {
        self.open && self.stream.peer_addr().is_ok()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.stream.shutdown(Shutdown::Both)
    }
}

/// Returns true for the error kinds a socket reports when a deadline expires.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn tcp_transport_writes_and_reads() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpConnector
            .connect("127.0.0.1", port, Duration::from_secs(1))
            .unwrap();
        let (mut server, _) = listener.accept().unwrap();

        transport.write_all(b"ping", Duration::from_secs(1)).unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").unwrap();
        let mut buf = [0u8; 16];
        let n = transport.read(&mut buf, Duration::from_secs(1)).unwrap();
        assert_eq!(&buf[..n], b"pong");
        assert!(transport.is_open());
        assert_eq!(transport.peer_addr().map(|a| a.port()), Some(port));
    }

    #[test]
    fn read_times_out_as_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpConnector
            .connect("127.0.0.1", port, Duration::from_secs(1))
            .unwrap();
        let _server = listener.accept().unwrap();

        let mut buf = [0u8; 16];
        let err = transport
            .read(&mut buf, Duration::from_millis(50))
            .unwrap_err();
        assert!(is_timeout(&err), "unexpected error kind: {:?}", err.kind());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpConnector
            .connect("127.0.0.1", port, Duration::from_secs(1))
            .unwrap();

        transport.shutdown().unwrap();
        assert!(!transport.is_open());
        transport.shutdown().unwrap();
    }

    #[test]
    fn connect_to_closed_port_fails() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TcpConnector.connect("127.0.0.1", port, Duration::from_secs(1));
        assert!(result.is_err());
    }
}
