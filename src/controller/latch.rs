//! # Latched Button State
//!
//! Small state machines that persist across ticks. Each one is updated once
//! per tick from the complete set of currently held buttons and reports
//! whether its output changed, so callers can log transitions without
//! logging every tick a button stays down.

use crate::protocol::types::{ManipulatorDirection, PayloadSelector};

/// Manipulator grip direction.
///
/// Open and close latch until released by the opposite button, by holding
/// both, or by the stop button; the last two stop the grip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManipulatorLatch {
    state: ManipulatorDirection,
}

impl ManipulatorLatch {
    /// Returns `true` if the direction changed.
    pub fn update(&mut self, open: bool, close: bool, stop: bool) -> bool {
        let next = match (open, close) {
            _ if stop => ManipulatorDirection::Stop,
            (true, true) => ManipulatorDirection::Stop,
            (true, false) => ManipulatorDirection::Open,
            (false, true) => ManipulatorDirection::Close,
            (false, false) => self.state,
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }

    #[must_use]
    pub fn state(&self) -> ManipulatorDirection {
        self.state
    }
}

/// Payload selector: idle / pump / laser.
///
/// When several buttons are held in one tick, stop beats laser beats pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadLatch {
    state: PayloadSelector,
}

impl PayloadLatch {
    /// Returns `true` if the selector changed.
    pub fn update(&mut self, pump: bool, laser: bool, stop: bool) -> bool {
        let next = if stop {
            PayloadSelector::Idle
        } else if laser {
            PayloadSelector::Laser
        } else if pump {
            PayloadSelector::Pump
        } else {
            self.state
        };
        let changed = next != self.state;
        self.state = next;
        changed
    }

    #[must_use]
    pub fn state(&self) -> PayloadSelector {
        self.state
    }
}

/// Motion power multiplier.
///
/// Not a latch in the strict sense: the reduced scale holds only while its
/// button is held and snaps back to full power the tick neither is down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerScale {
    factor: f32,
}

impl Default for PowerScale {
    fn default() -> Self {
        Self { factor: Self::FULL }
    }
}

impl PowerScale {
    pub const FULL: f32 = 1.0;
    pub const TWENTY_FIVE: f32 = 0.25;
    pub const FIFTY: f32 = 0.5;

    /// Returns `true` if the factor changed. Fifty wins if both are held.
    pub fn update(&mut self, twenty: bool, fifty: bool) -> bool {
        let next = if fifty {
            Self::FIFTY
        } else if twenty {
            Self::TWENTY_FIVE
        } else {
            Self::FULL
        };
        let changed = next != self.factor;
        self.factor = next;
        changed
    }

    #[must_use]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Factor as a whole percentage, for log lines.
    #[must_use]
    pub fn percent(&self) -> u32 {
        (self.factor * 100.0).round() as u32
    }
}
