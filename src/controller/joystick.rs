//! # Joystick Module
//!
//! Generic joystick/gamepad access through the Linux evdev interface.
//!
//! ## Device Detection
//!
//! A device qualifies as a joystick if it reports both `ABS_X` and `ABS_Y`
//! and at least one of the joystick (`BTN_TRIGGER`) or gamepad (`BTN_SOUTH`)
//! buttons. Keyboards and touchpads fail the second check.
//!
//! ## Index Order
//!
//! Axis and button indices follow evdev code order: axis 0 is the lowest
//! supported non-hat absolute axis, button 0 the lowest supported button
//! code at or above `BTN_0`. Hats are `ABS_HAT0X/Y` through `ABS_HAT3X/Y`.
//!
//! State is read with the `EVIOCGABS`/`EVIOCGKEY` ioctls on every poll, so
//! the snapshot always reflects the kernel's current view regardless of how
//! many events were queued in between.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use tracing::{debug, info};

use super::calibration::normalize_abs;
use super::device::{DeviceSnapshot, InputDevice};
use crate::error::{Result, RovLinkError};

/// First key code of the button range (`BTN_0`); lower codes are keyboard keys
const BUTTON_CODE_MIN: u16 = 0x100;

/// Hat axis pairs in index order
const HAT_AXES: [(AbsoluteAxisType, AbsoluteAxisType); 4] = [
    (AbsoluteAxisType::ABS_HAT0X, AbsoluteAxisType::ABS_HAT0Y),
    (AbsoluteAxisType::ABS_HAT1X, AbsoluteAxisType::ABS_HAT1Y),
    (AbsoluteAxisType::ABS_HAT2X, AbsoluteAxisType::ABS_HAT2Y),
    (AbsoluteAxisType::ABS_HAT3X, AbsoluteAxisType::ABS_HAT3Y),
];

/// Joystick handle
pub struct Joystick {
    device: Device,
    device_path: String,
    name: String,
    axes: Vec<AbsoluteAxisType>,
    buttons: Vec<Key>,
    hats: Vec<(AbsoluteAxisType, AbsoluteAxisType)>,
}

impl std::fmt::Debug for Joystick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joystick")
            .field("device_path", &self.device_path)
            .field("name", &self.name)
            .field("axes", &self.axes.len())
            .field("buttons", &self.buttons.len())
            .field("hats", &self.hats.len())
            .finish_non_exhaustive()
    }
}

impl Joystick {
    /// Open the first joystick found under `/dev/input`
    ///
    /// Event devices are scanned in path order so the choice is stable when
    /// several joysticks are plugged in.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no device looks like a joystick
    /// - `Controller`: `/dev/input` is missing or unreadable
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rov_link::controller::device::InputDevice;
    /// use rov_link::controller::joystick::Joystick;
    ///
    /// let joystick = Joystick::open()?;
    /// println!("Using {} at {}", joystick.name(), joystick.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(RovLinkError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut paths: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| RovLinkError::Controller(format!("Failed to read /dev/input: {}", e)))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );
                    if is_joystick(&device) {
                        return Ok(Self::from_device(device, path.to_string_lossy().to_string()));
                    }
                }
                Err(e) => {
                    // Permission denied is common for non-input-group devices
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(RovLinkError::ControllerNotFound)
    }

    /// Open a specific event device
    ///
    /// # Errors
    ///
    /// - `Controller`: the device cannot be opened
    /// - `ControllerNotFound`: the device is not a joystick
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let device = Device::open(path)
            .map_err(|e| RovLinkError::Controller(format!("Failed to open {}: {}", path.display(), e)))?;

        if !is_joystick(&device) {
            return Err(RovLinkError::ControllerNotFound);
        }
        Ok(Self::from_device(device, path.to_string_lossy().to_string()))
    }

    fn from_device(device: Device, device_path: String) -> Self {
        let hat_codes: Vec<u16> = HAT_AXES.iter().flat_map(|(x, y)| [x.0, y.0]).collect();

        let (axes, hats): (Vec<AbsoluteAxisType>, Vec<(AbsoluteAxisType, AbsoluteAxisType)>) =
            match device.supported_absolute_axes() {
                Some(supported) => {
                    let axes = supported
                        .iter()
                        .filter(|axis| !hat_codes.contains(&axis.0))
                        .collect();
                    let hats = HAT_AXES
                        .iter()
                        .copied()
                        .filter(|(x, y)| supported.contains(*x) && supported.contains(*y))
                        .collect();
                    (axes, hats)
                }
                None => (Vec::new(), Vec::new()),
            };

        let buttons: Vec<Key> = device
            .supported_keys()
            .map(|keys| {
                keys.iter()
                    .filter(|key| key.code() >= BUTTON_CODE_MIN)
                    .collect()
            })
            .unwrap_or_default();

        let name = device.name().unwrap_or("Joystick").to_string();
        info!(
            "Found joystick '{}' at {} ({} axes, {} buttons, {} hats)",
            name,
            device_path,
            axes.len(),
            buttons.len(),
            hats.len()
        );

        Self {
            device,
            device_path,
            name,
            axes,
            buttons,
            hats,
        }
    }

    /// `/dev/input/eventX` path the joystick was opened from
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Number of mapped axes
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    /// Number of mapped buttons
    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }
}

impl InputDevice for Joystick {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> Result<DeviceSnapshot> {
        let abs = self
            .device
            .get_abs_state()
            .map_err(|e| RovLinkError::Controller(format!("Failed to read axes: {}", e)))?;
        let keys = self
            .device
            .get_key_state()
            .map_err(|e| RovLinkError::Controller(format!("Failed to read buttons: {}", e)))?;

        let axes = self
            .axes
            .iter()
            .map(|axis| {
                let info = &abs[axis.0 as usize];
                normalize_abs(info.value, info.minimum, info.maximum)
            })
            .collect();

        let buttons = self.buttons.iter().map(|key| keys.contains(*key)).collect();

        // evdev reports hat "up" as negative Y
        let hats = self
            .hats
            .iter()
            .map(|(x, y)| {
                let hx = abs[x.0 as usize].value.signum() as i8;
                let hy = -(abs[y.0 as usize].value.signum() as i8);
                (hx, hy)
            })
            .collect();

        Ok(DeviceSnapshot { axes, buttons, hats })
    }
}

/// Joystick heuristic: two main axes plus a joystick or gamepad button.
fn is_joystick(device: &Device) -> bool {
    let has_sticks = device
        .supported_absolute_axes()
        .map(|axes| axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y))
        .unwrap_or(false);
    let has_buttons = device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_TRIGGER) || keys.contains(Key::BTN_SOUTH))
        .unwrap_or(false);
    has_sticks && has_buttons
}
