//! Connection lifecycle events and the notification sink that fans them out.
//!
//! Delivery is synchronous: [`NotificationSink::emit`] calls every subscriber
//! in subscription order on the caller's thread before returning. A
//! subscriber that panics is logged and skipped; the operation that emitted
//! the event carries on.
//!
//! # Example
//!
//! ```
//! use codroid_core::event::{Event, NotificationSink};
//!
//! let mut sink = NotificationSink::new();
//! let (_id, rx) = sink.subscribe_channel();
//!
//! sink.emit(Event::Connected);
//! assert_eq!(rx.try_recv().unwrap(), Event::Connected);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use tracing::{debug, warn};

/// An observable change in a connection's lifecycle or traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A connection was established.
    Connected,
    /// A connection was closed (also emitted when nothing was open).
    Disconnected,
    /// Raw request text written to the wire.
    MessageSent(String),
    /// Raw reply text read from the wire.
    MessageReceived(String),
    /// A human-readable failure description.
    Error(String),
}

impl Event {
    /// Returns a short name for the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::MessageSent(_) => "message_sent",
            Self::MessageReceived(_) => "message_received",
            Self::Error(_) => "error",
        }
    }

    /// Returns true for [`Event::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected | Self::Disconnected => f.write_str(self.kind()),
            Self::MessageSent(text) | Self::MessageReceived(text) => {
                write!(f, "{}: {}", self.kind(), text)
            }
            Self::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Handle returned by [`NotificationSink::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Event) + Send>;

/// Fan-out of [`Event`]s to zero or more subscribers.
#[derive(Default)]
pub struct NotificationSink {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl NotificationSink {
    /// Creates a sink with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber called for every emitted event.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Registers a subscriber that forwards events into a channel.
    ///
    /// Once the receiver is dropped, forwarding silently stops.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel();
        let id = self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    /// Removes a subscriber. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers an event to every subscriber.
    pub fn emit(&mut self, event: Event) {
        match &event {
            Event::Error(message) => warn!(message = %message, "connection error"),
            other => debug!(event = other.kind(), "connection event"),
        }

        for (id, subscriber) in &mut self.subscribers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event)));
            if result.is_err() {
                warn!(
                    subscription = id.0,
                    event = event.kind(),
                    "event subscriber panicked"
                );
            }
        }
    }
}

impl fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSink")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
