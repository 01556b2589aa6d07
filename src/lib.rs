//! # ROV Link Library
//!
//! Ground-control link for a remotely operated underwater vehicle.
//!
//! This library provides the core of the operator console: it turns joystick
//! input into control commands, sends them to the vehicle over UDP at a fixed
//! rate, and decodes the telemetry the vehicle sends back. A UI (or the
//! bundled headless binary) drives it through [`link::LinkSession`] or
//! [`link::ControlLoop`], reads telemetry through [`telemetry::TelemetryWatch`]
//! and receives diagnostics through a [`diagnostics::DiagnosticsSink`].

pub mod config;
pub mod error;
pub mod protocol;
pub mod controller;
pub mod link;
pub mod telemetry;
pub mod diagnostics;
