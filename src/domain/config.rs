//! Configuration profiles
//!
//! A Configuration is a saved profile for one controller on one serial port:
//! where it is wired, which address it answers to, and how long the driver
//! waits on it.

use serde::{Deserialize, Serialize};

use super::{Smc100Error, Smc100Result};

/// Highest address an RS-485 chain of these controllers can use.
pub const MAX_ADDRESS: u8 = 31;

/// Smallest reply buffer that still fits a hardware status reply (`31TS00000A`).
pub const MIN_REPLY_BUFFER: usize = 10;

/// Startup queues four reads (status, both limits, inputs); the queue must
/// hold all of them at once.
pub const MIN_QUEUE_CAPACITY: usize = 4;

fn default_address() -> u8 {
    1
}

fn default_baud_rate() -> u32 {
    57600
}

fn default_queue_capacity() -> usize {
    8
}

fn default_reply_buffer_size() -> usize {
    32
}

/// Protocol timing, in microseconds of the monotonic clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Maximum wait for a reply line to complete
    pub reply_timeout_us: u64,
    /// Wait after a fire-and-forget set before polling for command errors
    pub settle_timeout_us: u64,
    /// How often an idle session drains a stray inbound byte
    pub wipe_interval_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reply_timeout_us: 500_000,
            settle_timeout_us: 20_000,
            wipe_interval_us: 100_000,
        }
    }
}

/// A saved configuration profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    /// Profile name (e.g., "Default", "Beamline X")
    pub name: String,
    /// Selected serial port name
    #[serde(default)]
    pub serial_port: Option<String>,
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Controller address on the serial line
    #[serde(default = "default_address")]
    pub address: u8,
    /// Pending-command slots; the oldest entry is overwritten when full
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Longest reply line the driver accepts
    #[serde(default = "default_reply_buffer_size")]
    pub reply_buffer_size: usize,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            serial_port: None,
            baud_rate: default_baud_rate(),
            address: default_address(),
            queue_capacity: default_queue_capacity(),
            reply_buffer_size: default_reply_buffer_size(),
            timing: TimingConfig::default(),
        }
    }
}

impl Configuration {
    pub fn validate(&self) -> Smc100Result<()> {
        if !(1..=MAX_ADDRESS).contains(&self.address) {
            return Err(Smc100Error::Config(format!(
                "Address must be 1-{MAX_ADDRESS}, got {}",
                self.address
            )));
        }
        if self.queue_capacity < MIN_QUEUE_CAPACITY {
            return Err(Smc100Error::Config(format!(
                "Queue capacity must be at least {MIN_QUEUE_CAPACITY}, got {}",
                self.queue_capacity
            )));
        }
        if self.reply_buffer_size < MIN_REPLY_BUFFER {
            return Err(Smc100Error::Config(format!(
                "Reply buffer must hold at least {MIN_REPLY_BUFFER} bytes, got {}",
                self.reply_buffer_size
            )));
        }
        Ok(())
    }
}
