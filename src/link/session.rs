//! # Link Session
//!
//! Owns the UDP transport and mediates between the control loop (or a UI)
//! and the vehicle.
//!
//! - [`send_control`](LinkSession::send_control) encodes and transmits one
//!   command; failures are reported, never retried
//! - [`receive_telemetry`](LinkSession::receive_telemetry) waits a bounded
//!   time for one datagram and returns the last known good telemetry with a
//!   freshness flag and the typed outcome
//! - [`send_hello`](LinkSession::send_hello) is a one-shot handshake
//! - [`close`](LinkSession::close) (or a cloned [`ShutdownHandle`]) stops
//!   the session and unblocks a receive in progress
//!
//! The protocol has no acknowledgment or retransmission; the next tick
//! supersedes a lost datagram.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::transport::{DatagramIo, UdpTransport};
use crate::config::Config;
use crate::diagnostics::{DiagnosticsSink, LogLevel, OnceLatch};
use crate::error::{Result, RovLinkError};
use crate::protocol::decoder::{decode_packet, DecodeError, FailureKind, InboundPacket};
use crate::protocol::encoder::{encode_hello, ControlEncoder};
use crate::protocol::types::{
    ControlCommand, ControlSchema, Hello, Telemetry, TelemetryLayout, MAX_DATAGRAM_SIZE,
};
use crate::telemetry::{TelemetryCache, TelemetrySnapshot, TelemetryWatch};

/// Default time without fresh telemetry before the link is reported lost
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Outbound send failure.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("session closed")]
    Closed,
}

/// What a single receive attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Fresh telemetry decoded and cached
    Telemetry(TelemetryLayout),
    /// Vehicle hello; cache untouched
    Hello(Hello),
    /// Nothing arrived within the wait
    Timeout,
    /// Datagram dropped by the decoder
    Rejected(DecodeError),
    /// Socket-level receive error
    TransportFailed(io::ErrorKind),
    /// Session closed before or during the wait
    Closed,
}

/// Result of [`LinkSession::receive_telemetry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReading {
    /// Last known good telemetry
    pub telemetry: Telemetry,
    /// `true` only when this attempt decoded new telemetry
    pub fresh: bool,
    pub outcome: ReceiveOutcome,
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub control_sent: u64,
    pub hellos_sent: u64,
    pub send_failures: u64,
    pub telemetry_received: u64,
    pub hellos_received: u64,
    pub timeouts: u64,
    pub malformed: u64,
    pub crc_mismatches: u64,
    pub unknown_headers: u64,
    pub receive_errors: u64,
}

impl LinkStats {
    fn record_rejection(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::MalformedPacket => self.malformed += 1,
            FailureKind::CrcMismatch => self.crc_mismatches += 1,
            FailureKind::UnknownHeader => self.unknown_headers += 1,
        }
    }

    /// Datagrams dropped by the decoder, all kinds.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.malformed + self.crc_mismatches + self.unknown_headers
    }
}

/// Cooperative "running" flag shared between the session and whoever may
/// stop it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self {
            running: Arc::new(tx),
        }
    }

    /// Clear the running flag. Returns `true` if this call did it.
    pub fn close(&self) -> bool {
        self.running.send_if_modified(|running| std::mem::replace(running, false))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Resolves once the flag is cleared.
    pub async fn closed(&self) {
        let mut rx = self.running.subscribe();
        wait_closed(&mut rx).await;
    }
}

async fn wait_closed(running: &mut watch::Receiver<bool>) {
    loop {
        if !*running.borrow_and_update() {
            return;
        }
        if running.changed().await.is_err() {
            return;
        }
    }
}

/// One ground-station link to one vehicle.
pub struct LinkSession<T: DatagramIo = UdpTransport> {
    io: T,
    encoder: ControlEncoder,
    cache: TelemetryCache,
    sink: Arc<dyn DiagnosticsSink>,
    stats: LinkStats,
    shutdown: ShutdownHandle,
    link_timeout: Duration,
    last_fresh: Instant,
    link_lost: OnceLatch,
    buf: Vec<u8>,
}

impl<T: DatagramIo> std::fmt::Debug for LinkSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSession")
            .field("schema", &self.encoder.schema())
            .field("stats", &self.stats)
            .field("running", &self.shutdown.is_running())
            .finish_non_exhaustive()
    }
}

impl LinkSession<UdpTransport> {
    /// Bind a UDP session
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the local socket cannot be bound; the session
    /// cannot start without it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use rov_link::diagnostics::TracingSink;
    /// use rov_link::link::session::LinkSession;
    /// use rov_link::protocol::types::ControlSchema;
    ///
    /// # async fn demo() -> rov_link::error::Result<()> {
    /// let session = LinkSession::bind(
    ///     "0.0.0.0:3010".parse().unwrap(),
    ///     "192.168.1.5:3020".parse().unwrap(),
    ///     ControlSchema::default(),
    ///     Arc::new(TracingSink),
    /// )
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn bind(
        local: SocketAddr,
        remote: SocketAddr,
        schema: ControlSchema,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        let io = UdpTransport::bind(local, remote).await.map_err(|e| {
            let message = format!("Cannot bind {}: {}", local, e);
            sink.log(&message, LogLevel::Error);
            RovLinkError::Transport(message)
        })?;
        Ok(Self::with_transport(io, schema, sink))
    }

    /// Bind using the `[network]`, `[protocol]` and `[control]` sections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValidation` for bad addresses, `Transport` on bind failure.
    pub async fn from_config(config: &Config, sink: Arc<dyn DiagnosticsSink>) -> Result<Self> {
        let session = Self::bind(
            config.local_addr()?,
            config.remote_addr()?,
            config.control_schema(),
            sink,
        )
        .await?;
        Ok(session.with_link_timeout(config.link_timeout()))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.io.local_addr()
    }
}

impl<T: DatagramIo> LinkSession<T> {
    /// Build a session over any datagram transport.
    pub fn with_transport(io: T, schema: ControlSchema, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            io,
            encoder: ControlEncoder::new(schema),
            cache: TelemetryCache::new(),
            sink,
            stats: LinkStats::default(),
            shutdown: ShutdownHandle::new(),
            link_timeout: DEFAULT_LINK_TIMEOUT,
            last_fresh: Instant::now(),
            link_lost: OnceLatch::default(),
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Time without fresh telemetry before "link lost" is reported.
    #[must_use]
    pub fn with_link_timeout(mut self, timeout: Duration) -> Self {
        self.link_timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.io
    }

    pub fn schema(&self) -> ControlSchema {
        self.encoder.schema()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Last known good telemetry.
    pub fn telemetry(&self) -> Telemetry {
        self.cache.telemetry()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.cache.snapshot()
    }

    /// Reader handle for a UI on another task or thread.
    pub fn subscribe(&self) -> TelemetryWatch {
        self.cache.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Whether "link lost" has been reported and not yet cleared.
    pub fn is_link_lost(&self) -> bool {
        self.link_lost.is_raised()
    }

    /// Stop the session. A receive blocked on another task returns `Closed`.
    pub fn close(&self) {
        if self.shutdown.close() {
            self.sink.log("Link session closed", LogLevel::Info);
        }
    }

    /// Encode and transmit one control command
    ///
    /// # Errors
    ///
    /// - `Closed`: the session was closed
    /// - `Transport`: the socket rejected the datagram (reported, not retried)
    pub async fn send_control(&mut self, command: &ControlCommand) -> std::result::Result<(), SendError> {
        if !self.shutdown.is_running() {
            return Err(SendError::Closed);
        }
        let frame = self.encoder.encode(command);
        trace!("Control frame: {:02X?}", &frame[..]);

        match self.io.send(&frame).await {
            Ok(_) => {
                self.stats.control_sent += 1;
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                self.sink
                    .log(&format!("Failed to send control command: {}", e), LogLevel::Error);
                Err(SendError::Transport(e))
            }
        }
    }

    /// Send a hello announcing this session's protocol version
    ///
    /// # Errors
    ///
    /// Same as [`send_control`](Self::send_control).
    pub async fn send_hello(&mut self) -> std::result::Result<(), SendError> {
        if !self.shutdown.is_running() {
            return Err(SendError::Closed);
        }
        let frame = encode_hello(self.encoder.schema().version);

        match self.io.send(&frame).await {
            Ok(_) => {
                self.stats.hellos_sent += 1;
                debug!("Hello sent (protocol version {})", self.encoder.schema().version);
                Ok(())
            }
            Err(e) => {
                self.stats.send_failures += 1;
                self.sink.log(&format!("Failed to send hello: {}", e), LogLevel::Error);
                Err(SendError::Transport(e))
            }
        }
    }

    /// Wait up to `wait` for one inbound datagram
    ///
    /// Never blocks past `wait`, and returns early with
    /// [`ReceiveOutcome::Closed`] if the session is closed meanwhile. Only a
    /// datagram that passes header, length and CRC checks replaces the cached
    /// telemetry; every other outcome returns the cache unchanged with
    /// `fresh = false`.
    pub async fn receive_telemetry(&mut self, wait: Duration) -> TelemetryReading {
        if !self.shutdown.is_running() {
            return self.stale(ReceiveOutcome::Closed);
        }

        let mut running = self.shutdown.running.subscribe();
        let received = tokio::select! {
            result = tokio::time::timeout(wait, self.io.recv(&mut self.buf)) => Some(result),
            _ = wait_closed(&mut running) => None,
        };

        match received {
            None => self.stale(ReceiveOutcome::Closed),
            Some(Err(_elapsed)) => {
                self.stats.timeouts += 1;
                trace!("No datagram within {:?}", wait);
                self.stale(ReceiveOutcome::Timeout)
            }
            Some(Ok(Err(e))) => {
                self.stats.receive_errors += 1;
                self.sink
                    .log(&format!("Receive failed: {}", e), LogLevel::Warning);
                self.stale(ReceiveOutcome::TransportFailed(e.kind()))
            }
            Some(Ok(Ok(len))) => self.handle_datagram(len),
        }
    }

    fn handle_datagram(&mut self, len: usize) -> TelemetryReading {
        match decode_packet(&self.buf[..len]) {
            Ok(InboundPacket::Telemetry { telemetry, layout }) => {
                self.stats.telemetry_received += 1;
                self.last_fresh = Instant::now();
                if self.link_lost.clear() {
                    self.sink.log("Telemetry link restored", LogLevel::Info);
                }
                let snapshot = self.cache.replace(telemetry, layout);
                trace!("Telemetry #{} ({:?})", snapshot.sequence, layout);
                TelemetryReading {
                    telemetry: snapshot.telemetry,
                    fresh: true,
                    outcome: ReceiveOutcome::Telemetry(layout),
                }
            }
            Ok(InboundPacket::Hello(hello)) => {
                self.stats.hellos_received += 1;
                let local = self.encoder.schema().version;
                if hello.version == local {
                    self.sink.log(
                        &format!("Vehicle hello, protocol version {}", hello.version),
                        LogLevel::Info,
                    );
                } else {
                    self.sink.log(
                        &format!(
                            "Vehicle hello with protocol version {} (ground station speaks {})",
                            hello.version, local
                        ),
                        LogLevel::Warning,
                    );
                }
                self.stale(ReceiveOutcome::Hello(hello))
            }
            Err(e) => {
                self.stats.record_rejection(e.kind());
                self.sink
                    .log(&format!("Dropped datagram: {}", e), LogLevel::Warning);
                self.stale(ReceiveOutcome::Rejected(e))
            }
        }
    }

    fn stale(&mut self, outcome: ReceiveOutcome) -> TelemetryReading {
        let snapshot = self.cache.mark_stale();

        if outcome != ReceiveOutcome::Closed
            && self.last_fresh.elapsed() >= self.link_timeout
            && self.link_lost.raise()
        {
            self.sink.log(
                &format!(
                    "Telemetry link lost (nothing valid for {} ms)",
                    self.link_timeout.as_millis()
                ),
                LogLevel::Warning,
            );
        }

        TelemetryReading {
            telemetry: snapshot.telemetry,
            fresh: false,
            outcome,
        }
    }
}
