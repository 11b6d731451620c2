//! Core domain types

use serde::{Deserialize, Serialize};

/// Number of GPIO lines exposed by the controller's I/O connector.
pub const GPIO_WIDTH: u8 = 4;

/// Coarse operating state derived from the controller's two-character state code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    /// Never queried yet
    #[default]
    Unknown,
    /// The controller replied with a code outside the known table
    Error,
    NoReference,
    Homing,
    Moving,
    Ready,
    Disabled,
    Jogging,
}

/// Travel limits as last read back from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelLimits {
    pub negative: f64,
    pub positive: f64,
}

impl TravelLimits {
    /// Clamp `target` into `[negative, positive]`.
    ///
    /// Lower bound is applied first, so a pair of unread (zero) limits
    /// pins every target to zero. `NaN` compares false both ways and comes
    /// back unchanged; callers filter non-finite targets first.
    pub fn clamp(&self, target: f64) -> f64 {
        let mut target = target;
        if target < self.negative {
            target = self.negative;
        }
        if target > self.positive {
            target = self.positive;
        }
        target
    }
}

/// Everything the driver knows about the stage. Mutated only by reply decoding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub position: f64,
    pub limits: TravelLimits,
    pub gpio_input: u8,
    pub gpio_output: u8,
    pub analogue: f64,
    pub status: Status,
    pub homed: bool,
    pub busy: bool,
}

/// Information about a serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub name: String,
    pub port_type: String,
}

/// Clamp a GPIO pin index to the highest valid bit.
pub fn clamp_pin(pin: u8) -> u8 {
    pin.min(GPIO_WIDTH - 1)
}
