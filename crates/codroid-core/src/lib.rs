//! Core types: connection events, notification sink, tracing setup

pub mod event;
pub mod tracing;

pub use event::{Event, NotificationSink, SubscriptionId};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
