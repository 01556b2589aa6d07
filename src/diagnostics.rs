//! # Diagnostics Sink
//!
//! Callback-style log sink supplied by the surrounding application.
//!
//! The link reports operator-facing events (`(message, level)` pairs) through
//! a [`DiagnosticsSink`]. Three implementations ship with the crate:
//!
//! - [`TracingSink`]: forwards to `tracing`, used by the headless binary
//! - [`ChannelSink`]: queues [`LogEntry`] values for a UI thread to drain
//! - any `Fn(&str, LogLevel) + Send + Sync` closure

use std::fmt;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Severity accepted by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
    /// Lines relayed from the vehicle's serial console
    Serial,
}

impl LogLevel {
    /// Upper-case tag as shown in the operator console.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
            LogLevel::Serial => "SERIAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of operator-facing diagnostics.
///
/// Implementations must not block: the control loop calls `log` inline.
#[cfg_attr(test, mockall::automock)]
pub trait DiagnosticsSink: Send + Sync {
    fn log(&self, message: &str, level: LogLevel);
}

impl<F> DiagnosticsSink for F
where
    F: Fn(&str, LogLevel) + Send + Sync,
{
    fn log(&self, message: &str, level: LogLevel) {
        self(message, level)
    }
}

/// Forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Info => info!(target: "rov_link::operator", "{}", message),
            LogLevel::Warning => warn!(target: "rov_link::operator", "{}", message),
            LogLevel::Error => error!(target: "rov_link::operator", "{}", message),
            LogLevel::Debug => debug!(target: "rov_link::operator", "{}", message),
            LogLevel::Serial => info!(target: "rov_link::serial", "{}", message),
        }
    }
}

/// One queued diagnostics line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Queues diagnostics for another thread.
///
/// The control loop is the only writer; the UI side owns the receiver and
/// drains it on its own schedule. Entries sent after the receiver is dropped
/// are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl ChannelSink {
    /// Creates a sink and the receiver the UI drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DiagnosticsSink for ChannelSink {
    fn log(&self, message: &str, level: LogLevel) {
        let entry = LogEntry {
            timestamp: Local::now(),
            level,
            message: message.to_string(),
        };
        // Receiver gone means the UI has shut down.
        let _ = self.tx.send(entry);
    }
}

/// Reports a condition once until it clears.
///
/// Used for conditions that persist across ticks (missing input device,
/// lost telemetry link) so the sink sees one line per episode, not one per tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnceLatch {
    raised: bool,
}

impl OnceLatch {
    /// Returns `true` the first time it is called after construction or
    /// after [`clear`](Self::clear).
    pub fn raise(&mut self) -> bool {
        !std::mem::replace(&mut self.raised, true)
    }

    /// Returns `true` if the latch was raised.
    pub fn clear(&mut self) -> bool {
        std::mem::replace(&mut self.raised, false)
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_level_tags() {
        assert_eq!(LogLevel::Info.to_string(), "INFO");
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
        assert_eq!(LogLevel::Serial.to_string(), "SERIAL");
    }

    #[test]
    fn test_closure_sink() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let sink = move |msg: &str, level: LogLevel| {
            captured.lock().unwrap().push((msg.to_string(), level));
        };

        sink.log("pump on", LogLevel::Info);

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], ("pump on".to_string(), LogLevel::Info));
    }

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();

        sink.log("first", LogLevel::Info);
        sink.log("second", LogLevel::Error);

        let a = rx.try_recv().unwrap();
        let b = rx.try_recv().unwrap();
        assert_eq!(a.message, "first");
        assert_eq!(b.level, LogLevel::Error);
        assert!(a.timestamp <= b.timestamp);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_after_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        // Must not panic
        sink.log("late", LogLevel::Debug);
    }

    #[test]
    fn test_tracing_sink_all_levels() {
        let sink = TracingSink;
        for level in [
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Debug,
            LogLevel::Serial,
        ] {
            sink.log("probe", level);
        }
    }

    #[test]
    fn test_once_latch() {
        let mut latch = OnceLatch::default();
        assert!(latch.raise());
        assert!(!latch.raise());
        assert!(latch.is_raised());
        assert!(latch.clear());
        assert!(!latch.clear());
        assert!(latch.raise());
    }
}
