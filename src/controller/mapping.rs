//! # Input Mapping
//!
//! Persisted assignment of logical actions to physical axis, button and hat
//! indices, stored as a flat JSON object:
//!
//! ```json
//! {
//!     "axis_x": 1, "axis_y": 0, "axis_z": 2, "axis_w": 5,
//!     "manipulator_open": 20, "manipulator_close": 22,
//!     "pump": 6, "laser": 19, "stop_polnagr": 21,
//!     "twenty_power": 2, "fifty_power": 3
//! }
//! ```
//!
//! Keys that are absent keep their default; unknown keys are ignored.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::diagnostics::{DiagnosticsSink, LogLevel};
use crate::error::Result;

/// Logical action → device index table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputMapping {
    /// Surge axis index
    pub axis_x: usize,
    /// Sway axis index
    pub axis_y: usize,
    /// Heave axis index
    pub axis_z: usize,
    /// Yaw axis index
    pub axis_w: usize,
    /// Axis driving manipulator rotation; `null` uses hat X
    pub manipulator_rotation: Option<usize>,
    /// Hat driving camera rotation
    pub camera_rotation: usize,
    pub manipulator_open: usize,
    pub manipulator_close: usize,
    pub twenty_power: usize,
    pub fifty_power: usize,
    pub pump: usize,
    pub laser: usize,
    /// Payload stop button
    #[serde(alias = "stop")]
    pub stop_polnagr: usize,
}

impl Default for InputMapping {
    fn default() -> Self {
        Self {
            axis_x: 1,
            axis_y: 0,
            axis_z: 2,
            axis_w: 5,
            manipulator_rotation: None,
            camera_rotation: 0,
            manipulator_open: 20,
            manipulator_close: 22,
            twenty_power: 2,
            fifty_power: 3,
            pump: 6,
            laser: 19,
            stop_polnagr: 21,
        }
    }
}

impl InputMapping {
    /// Parse a mapping document.
    ///
    /// # Errors
    ///
    /// Returns `Mapping` error if the text is not a JSON object of indices.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a mapping file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Mapping` if it does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Load a mapping file, falling back to defaults on any failure.
    ///
    /// The failure is reported once through `sink` as a WARNING.
    pub fn load_or_default<P: AsRef<Path>>(path: P, sink: &dyn DiagnosticsSink) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(mapping) => {
                info!("Loaded input mapping from {}", path.display());
                mapping
            }
            Err(crate::error::RovLinkError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No mapping file at {}", path.display());
                sink.log(
                    &format!("Joystick settings {} not found, using defaults", path.display()),
                    LogLevel::Warning,
                );
                Self::default()
            }
            Err(e) => {
                sink.log(
                    &format!("Cannot load joystick settings {}: {}", path.display(), e),
                    LogLevel::Warning,
                );
                Self::default()
            }
        }
    }

    /// Largest button index referenced by the mapping.
    #[must_use]
    pub fn max_button(&self) -> usize {
        [
            self.manipulator_open,
            self.manipulator_close,
            self.twenty_power,
            self.fifty_power,
            self.pump,
            self.laser,
            self.stop_polnagr,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MockDiagnosticsSink;
    use mockall::predicate::eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let mapping = InputMapping::from_json(r#"{"axis_x": 3, "pump": 11}"#).unwrap();
        assert_eq!(mapping.axis_x, 3);
        assert_eq!(mapping.pump, 11);
        assert_eq!(mapping.axis_y, InputMapping::default().axis_y);
        assert_eq!(mapping.manipulator_rotation, None);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mapping = InputMapping::from_json(r#"{"axis_w": 4, "turbo": 9}"#).unwrap();
        assert_eq!(mapping.axis_w, 4);
    }

    #[test]
    fn test_manipulator_rotation_axis() {
        let mapping = InputMapping::from_json(r#"{"manipulator_rotation": 4}"#).unwrap();
        assert_eq!(mapping.manipulator_rotation, Some(4));

        let mapping = InputMapping::from_json(r#"{"manipulator_rotation": null}"#).unwrap();
        assert_eq!(mapping.manipulator_rotation, None);
    }

    #[test]
    fn test_negative_index_rejected() {
        assert!(InputMapping::from_json(r#"{"axis_x": -1}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"laser": 12, "stop": 13}"#).unwrap();
        file.flush().unwrap();

        let mapping = InputMapping::load(file.path()).unwrap();
        assert_eq!(mapping.laser, 12);
        assert_eq!(mapping.stop_polnagr, 13);
    }

    #[test]
    fn test_missing_file_warns_once_and_defaults() {
        let mut sink = MockDiagnosticsSink::new();
        sink.expect_log()
            .with(mockall::predicate::always(), eq(LogLevel::Warning))
            .times(1)
            .return_const(());

        let mapping = InputMapping::load_or_default("/nonexistent/Joystick.settings", &sink);
        assert_eq!(mapping, InputMapping::default());
    }

    #[test]
    fn test_malformed_file_warns_and_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ axis_x: ").unwrap();
        file.flush().unwrap();

        let mut sink = MockDiagnosticsSink::new();
        sink.expect_log()
            .withf(|msg, level| msg.contains("Cannot load") && *level == LogLevel::Warning)
            .times(1)
            .return_const(());

        let mapping = InputMapping::load_or_default(file.path(), &sink);
        assert_eq!(mapping, InputMapping::default());
    }

    #[test]
    fn test_max_button() {
        assert_eq!(InputMapping::default().max_button(), 22);
    }
}
