//! Input device abstraction.
//!
//! The mapper never touches evdev directly; it is handed an [`InputDevice`]
//! at construction so tests can drive it with scripted snapshots.

use crate::error::Result;

/// Current state of every control on the device.
///
/// Axis values are normalized to −1.0..=1.0. Hat components are −1, 0 or +1
/// with +y meaning "up".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
    pub hats: Vec<(i8, i8)>,
}

impl DeviceSnapshot {
    /// Axis value by index, 0.0 if the device has no such axis.
    #[must_use]
    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    /// Button state by index, released if the device has no such button.
    #[must_use]
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Hat position by index, centered if the device has no such hat.
    #[must_use]
    pub fn hat(&self, index: usize) -> (i8, i8) {
        self.hats.get(index).copied().unwrap_or((0, 0))
    }
}

/// A joystick-like device polled once per tick.
pub trait InputDevice: Send {
    /// Human-readable device name
    fn name(&self) -> &str;

    /// Read the current state of all axes, buttons and hats.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if the device went away.
    fn poll(&mut self) -> Result<DeviceSnapshot>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_indices_are_neutral() {
        let snapshot = DeviceSnapshot {
            axes: vec![0.5],
            buttons: vec![true],
            hats: vec![(1, -1)],
        };

        assert_eq!(snapshot.axis(0), 0.5);
        assert_eq!(snapshot.axis(7), 0.0);
        assert!(snapshot.button(0));
        assert!(!snapshot.button(30));
        assert_eq!(snapshot.hat(0), (1, -1));
        assert_eq!(snapshot.hat(2), (0, 0));
    }

    #[test]
    fn test_scripted_device_repeats_last_frame() {
        let mut device = mocks::ScriptedDevice::new();
        device.push(DeviceSnapshot {
            axes: vec![0.25],
            ..Default::default()
        });

        assert_eq!(device.poll().unwrap().axis(0), 0.25);
        assert_eq!(device.poll().unwrap().axis(0), 0.25);

        device.disconnect();
        assert!(device.poll().is_err());
    }
}
