//! Bus event stream
//!
//! Every connect/disconnect/probe/read/write/skip/error outcome becomes an
//! ordered, timestamped [`BusEvent`] published on a broadcast channel and
//! mirrored to `tracing` (dual output). Subscribers - typically a UI log
//! window - decide how much history to keep; the engine never bounds the
//! stream and never drops an error from it.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// One timestamped log line from the engine
#[derive(Debug, Clone)]
pub struct BusEvent {
    pub at: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for BusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.at.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.severity,
            self.message
        )
    }
}

/// Broadcast publisher for bus events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create an event bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Publish an informational event
    pub fn info(&self, message: impl Into<String>) {
        self.publish(Severity::Info, message.into());
    }

    /// Publish a warning event
    pub fn warn(&self, message: impl Into<String>) {
        self.publish(Severity::Warning, message.into());
    }

    /// Publish an error event
    pub fn error(&self, message: impl Into<String>) {
        self.publish(Severity::Error, message.into());
    }

    fn publish(&self, severity: Severity, message: String) {
        match severity {
            Severity::Info => info!(target: "servo_bus", "{message}"),
            Severity::Warning => warn!(target: "servo_bus", "{message}"),
            Severity::Error => error!(target: "servo_bus", "{message}"),
        }
        // A send error only means nobody is subscribed right now.
        let _ = self.tx.send(BusEvent {
            at: Utc::now(),
            severity,
            message,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new(256)
    }
}
