//! In-memory transport used by unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::transport::{Connector, Transport};

/// Scripted outcome of one read call.
#[derive(Debug)]
pub enum MockReply {
    Data(Vec<u8>),
    Eof,
    Error(io::ErrorKind),
}

/// Observable state shared between a test and its mock transport.
#[derive(Debug)]
pub struct MockTransportState {
    pub open: bool,
    pub connects: usize,
    pub writes: Vec<Vec<u8>>,
    pub reads: usize,
    pub shutdowns: usize,
    pub fail_write: Option<io::ErrorKind>,
    pub fail_shutdown: bool,
    /// Reply with the last written bytes when the script is empty.
    pub echo: bool,
    pub replies: VecDeque<MockReply>,
}

impl MockTransportState {
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            open: false,
            connects: 0,
            writes: Vec::new(),
            reads: 0,
            shutdowns: 0,
            fail_write: None,
            fail_shutdown: false,
            echo: false,
            replies: VecDeque::new(),
        }))
    }

    pub fn push_reply(&mut self, text: &str) {
        self.replies.push_back(MockReply::Data(text.as_bytes().to_vec()));
    }

    /// Returns the written requests as text.
    pub fn sent(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }
}

pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl Transport for MockTransport {
    fn write_all(&mut self, data: &[u8], _timeout: Duration) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(kind) = state.fail_write {
            return Err(kind.into());
        }
        state.writes.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        let next = state.replies.pop_front();
        let reply = match next {
            Some(reply) => reply,
            None if state.echo => MockReply::Data(state.writes.last().cloned().unwrap_or_default()),
            None => MockReply::Error(io::ErrorKind::WouldBlock),
        };
        match reply {
            MockReply::Data(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            MockReply::Eof => Ok(0),
            MockReply::Error(kind) => Err(kind.into()),
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    fn shutdown(&mut self) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.shutdowns += 1;
        state.open = false;
        if state.fail_shutdown {
            return Err(io::ErrorKind::NotConnected.into());
        }
        Ok(())
    }
}

/// Connector handing out [`MockTransport`]s over one shared state, or failing.
pub struct MockConnector {
    state: Option<Arc<Mutex<MockTransportState>>>,
    error: io::ErrorKind,
}

impl MockConnector {
    pub fn ok(state: &Arc<Mutex<MockTransportState>>) -> Self {
        Self {
            state: Some(Arc::clone(state)),
            error: io::ErrorKind::ConnectionRefused,
        }
    }

    pub fn failing(error: io::ErrorKind) -> Self {
        Self { state: None, error }
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, _host: &str, _port: u16, _timeout: Duration) -> io::Result<MockTransport> {
        let state = self.state.as_ref().ok_or_else(|| io::Error::from(self.error))?;
        let mut guard = state.lock().unwrap();
        guard.connects += 1;
        guard.open = true;
        drop(guard);
        Ok(MockTransport {
            state: Arc::clone(state),
        })
    }
}

/// Returns a connected mock connection that replies with each request it receives.
pub fn echo_connection() -> (
    crate::Connection<MockConnector>,
    Arc<Mutex<MockTransportState>>,
) {
    let state = MockTransportState::shared();
    state.lock().unwrap().echo = true;
    let mut conn = crate::Connection::with_connector(
        crate::ConnectionSettings::default(),
        MockConnector::ok(&state),
    );
    conn.connect(Duration::from_millis(100)).unwrap();
    (conn, state)
}
