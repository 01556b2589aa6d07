//! # Link Module
//!
//! UDP link to the vehicle.
//!
//! This module handles:
//! - Binding the local socket and sending to the fixed vehicle address
//! - Sending control commands and hellos
//! - Bounded-wait telemetry receive with last-known-good fallback
//! - Link-loss detection and session counters
//! - The fixed-rate control loop and its cooperative shutdown

pub mod transport;
pub mod session;
pub mod runner;

pub use runner::{ControlLoop, LoopSettings};
pub use session::{LinkSession, ReceiveOutcome, SendError, ShutdownHandle, TelemetryReading};
