//! # Telemetry Module
//!
//! Last-known-good telemetry cache shared between the link loop and a UI.
//!
//! This module handles:
//! - Holding the most recent successfully decoded [`Telemetry`]
//! - Replacing it wholesale on each fresh packet (never mutating in place)
//! - Publishing snapshots to readers on other threads
//!
//! The session owns the single [`TelemetryCache`] writer; any number of
//! [`TelemetryWatch`] readers observe either the previous snapshot or the
//! complete new one, never a partially updated record.

use std::time::Instant;

use tokio::sync::watch;

use crate::protocol::types::{Telemetry, TelemetryLayout};

/// Published telemetry state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    /// Last known good telemetry (all zeros before the first packet)
    pub telemetry: Telemetry,
    /// Whether the most recent receive attempt produced this value
    pub fresh: bool,
    /// Layout of the packet the telemetry came from
    pub layout: Option<TelemetryLayout>,
    /// When the telemetry was decoded
    pub received_at: Option<Instant>,
    /// Number of packets accepted so far
    pub sequence: u64,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            telemetry: Telemetry::default(),
            fresh: false,
            layout: None,
            received_at: None,
            sequence: 0,
        }
    }
}

impl TelemetrySnapshot {
    /// Time since the cached telemetry was decoded.
    #[must_use]
    pub fn age(&self) -> Option<std::time::Duration> {
        self.received_at.map(|at| at.elapsed())
    }
}

/// Writer half, owned by the link session.
#[derive(Debug)]
pub struct TelemetryCache {
    tx: watch::Sender<TelemetrySnapshot>,
}

impl Default for TelemetryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryCache {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TelemetrySnapshot::default());
        Self { tx }
    }

    /// Current cached telemetry.
    #[must_use]
    pub fn telemetry(&self) -> Telemetry {
        self.tx.borrow().telemetry
    }

    /// Full current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        *self.tx.borrow()
    }

    /// Replace the cached telemetry with a freshly decoded value.
    pub fn replace(&self, telemetry: Telemetry, layout: TelemetryLayout) -> TelemetrySnapshot {
        let previous = self.snapshot();
        let next = TelemetrySnapshot {
            telemetry,
            fresh: true,
            layout: Some(layout),
            received_at: Some(Instant::now()),
            sequence: previous.sequence + 1,
        };
        self.tx.send_replace(next);
        next
    }

    /// Keep the cached telemetry but mark it stale.
    pub fn mark_stale(&self) -> TelemetrySnapshot {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.fresh;
            snapshot.fresh = false;
            changed
        });
        self.snapshot()
    }

    /// Creates a reader handle for another task or thread.
    #[must_use]
    pub fn subscribe(&self) -> TelemetryWatch {
        TelemetryWatch {
            rx: self.tx.subscribe(),
        }
    }
}

/// Reader half, handed to the UI.
#[derive(Debug, Clone)]
pub struct TelemetryWatch {
    rx: watch::Receiver<TelemetrySnapshot>,
}

impl TelemetryWatch {
    /// Latest published snapshot.
    #[must_use]
    pub fn latest(&self) -> TelemetrySnapshot {
        *self.rx.borrow()
    }

    /// Waits for the next published change.
    ///
    /// Returns `None` once the session (the writer) has been dropped.
    pub async fn changed(&mut self) -> Option<TelemetrySnapshot> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
