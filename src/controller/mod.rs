//! # Controller Module
//!
//! Joystick input handling.
//!
//! This module handles:
//! - Joystick detection and state reads via evdev
//! - Loading the persisted action → index mapping
//! - Deadzone, expo and inversion shaping of motion axes
//! - Latched manipulator, payload and power-scale state
//! - Building one control command per tick, with a neutral fallback

pub mod device;
pub mod joystick;
pub mod mapping;
pub mod latch;
pub mod calibration;
pub mod mapper;
