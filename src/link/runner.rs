//! # Control Loop
//!
//! Fixed-rate poll → send → receive loop driving one [`LinkSession`].
//!
//! Each tick the mapper is polled for a command, the command is sent, and
//! one receive is attempted with a wait shorter than the tick period, so a
//! silent vehicle never stretches the tick. A send failure is reported by
//! the session and the loop simply moves on to the next tick.
//!
//! The loop checks the session's running flag every tick; closing the
//! session through a [`ShutdownHandle`] ends [`ControlLoop::run`] promptly,
//! even mid-receive.

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::session::{LinkSession, LinkStats, ShutdownHandle, TelemetryReading};
use super::transport::{DatagramIo, UdpTransport};
use crate::config::Config;
use crate::controller::mapper::InputMapper;
use crate::telemetry::TelemetryWatch;

/// Number of ticks between status log lines (10 s at 10 Hz)
pub const LOG_INTERVAL_TICKS: u64 = 100;

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub tick_period: Duration,
    pub receive_timeout: Duration,
    pub hello_on_start: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
            receive_timeout: Duration::from_millis(50),
            hello_on_start: true,
        }
    }
}

impl LoopSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_period: config.tick_period(),
            receive_timeout: config.receive_timeout().min(config.tick_period()),
            hello_on_start: config.control.hello_on_start,
        }
    }
}

/// Session plus mapper, ticked at a fixed rate.
pub struct ControlLoop<T: DatagramIo = UdpTransport> {
    session: LinkSession<T>,
    mapper: InputMapper,
    settings: LoopSettings,
    ticks: u64,
}

impl<T: DatagramIo> ControlLoop<T> {
    pub fn new(session: LinkSession<T>, mapper: InputMapper, settings: LoopSettings) -> Self {
        Self {
            session,
            mapper,
            settings,
            ticks: 0,
        }
    }

    /// Handle that stops [`run`](Self::run) from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.session.shutdown_handle()
    }

    /// Telemetry reader for a UI.
    pub fn subscribe(&self) -> TelemetryWatch {
        self.session.subscribe()
    }

    pub fn session(&self) -> &LinkSession<T> {
        &self.session
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One poll → send → receive iteration.
    pub async fn tick(&mut self) -> TelemetryReading {
        let command = self.mapper.tick();

        // Already reported through the sink; next tick retries with fresh state
        if let Err(e) = self.session.send_control(&command).await {
            debug!("Tick {}: {}", self.ticks, e);
        }

        let reading = self
            .session
            .receive_telemetry(self.settings.receive_timeout)
            .await;
        self.ticks += 1;
        reading
    }

    /// Run until the session is closed; returns the final counters.
    pub async fn run(mut self) -> LinkStats {
        let shutdown = self.session.shutdown_handle();

        if self.settings.hello_on_start {
            if let Err(e) = self.session.send_hello().await {
                debug!("Hello not sent: {}", e);
            }
        }

        let mut ticker = interval(self.settings.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Starting control loop at {:.1}Hz",
            1.0 / self.settings.tick_period.as_secs_f64()
        );
        let mut last_log_tick: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.closed() => break,
            }
            if !shutdown.is_running() {
                break;
            }

            self.tick().await;

            if self.ticks - last_log_tick >= LOG_INTERVAL_TICKS {
                let stats = self.session.stats();
                info!(
                    "Sent {} commands, received {} telemetry ({} timeouts, {} rejected){}",
                    stats.control_sent,
                    stats.telemetry_received,
                    stats.timeouts,
                    stats.rejected(),
                    if self.mapper.is_degraded() { ", joystick missing" } else { "" }
                );
                last_log_tick = self.ticks;
            }
        }

        let stats = self.session.stats();
        info!(
            "Control loop stopped after {} ticks ({} commands sent)",
            self.ticks, stats.control_sent
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::MotionShaping;
    use crate::controller::device::mocks::ScriptedDevice;
    use crate::controller::device::DeviceSnapshot;
    use crate::controller::mapper::Setpoints;
    use crate::controller::mapping::InputMapping;
    use crate::diagnostics::{DiagnosticsSink, LogLevel};
    use crate::link::session::ReceiveOutcome;
    use crate::link::transport::mocks::MockDatagramIo;
    use crate::protocol::encoder::encode_telemetry;
    use crate::protocol::types::{
        ControlSchema, Telemetry, TelemetryLayout, HEADER_CONTROL, HEADER_HELLO,
    };
    use std::sync::Arc;

    fn quiet_sink() -> Arc<dyn DiagnosticsSink> {
        Arc::new(|_: &str, _: LogLevel| {})
    }

    fn fast_settings() -> LoopSettings {
        LoopSettings {
            tick_period: Duration::from_millis(10),
            receive_timeout: Duration::from_millis(5),
            hello_on_start: true,
        }
    }

    fn control_loop(mock: &MockDatagramIo, device: Option<ScriptedDevice>) -> ControlLoop<MockDatagramIo> {
        let session = LinkSession::with_transport(mock.clone(), ControlSchema::default(), quiet_sink());
        let mapper = InputMapper::new(
            device.map(|d| Box::new(d) as Box<dyn crate::controller::device::InputDevice>),
            InputMapping::default(),
            MotionShaping::identity(),
            Setpoints::default(),
            quiet_sink(),
        );
        ControlLoop::new(session, mapper, fast_settings())
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = LoopSettings::from_config(&Config::default());
        assert_eq!(settings, LoopSettings::default());
    }

    #[tokio::test]
    async fn test_tick_sends_then_receives() {
        let mock = MockDatagramIo::new();
        let device = ScriptedDevice::new();
        device.push(DeviceSnapshot {
            axes: vec![0.0, 0.5],
            ..Default::default()
        });
        let mut control = control_loop(&mock, Some(device));

        let telemetry = Telemetry {
            depth: 12.0,
            ..Default::default()
        };
        mock.push_inbound(&encode_telemetry(&telemetry, TelemetryLayout::V2));

        let reading = control.tick().await;
        assert!(reading.fresh);
        assert_eq!(reading.telemetry.depth, 12.0);

        let sent = mock.get_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][0], HEADER_CONTROL);
        // axis_x (device axis 1) as int8 percent
        assert_eq!(sent[0][2] as i8, 50);
        assert_eq!(control.ticks(), 1);
    }

    #[tokio::test]
    async fn test_tick_survives_send_failure() {
        let mock = MockDatagramIo::new();
        mock.set_send_error(std::io::ErrorKind::NetworkUnreachable);
        let mut control = control_loop(&mock, None);

        let reading = control.tick().await;
        assert_eq!(reading.outcome, ReceiveOutcome::Timeout);
        assert_eq!(control.session().stats().send_failures, 1);
    }

    #[tokio::test]
    async fn test_run_until_closed() {
        let mock = MockDatagramIo::new();
        let control = control_loop(&mock, None);
        let handle = control.shutdown_handle();

        let runner = tokio::spawn(control.run());
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.close();

        let stats = tokio::time::timeout(Duration::from_secs(2), runner)
            .await
            .expect("loop did not stop")
            .unwrap();

        assert_eq!(stats.hellos_sent, 1);
        assert!(stats.control_sent >= 1);

        let sent = mock.get_sent();
        assert_eq!(sent[0][0], HEADER_HELLO);
        assert!(sent[1..].iter().all(|frame| frame[0] == HEADER_CONTROL));
    }

    #[tokio::test]
    async fn test_run_closed_before_start() {
        let mock = MockDatagramIo::new();
        let control = control_loop(&mock, None);
        control.shutdown_handle().close();

        let stats = control.run().await;
        assert_eq!(stats.control_sent, 0);
        assert!(mock.get_sent().is_empty());
    }
}
