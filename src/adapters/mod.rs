//! Adapter implementations of port traits
//!
//! These connect the driver core to the outside world:
//! - `serial_port`: serialport-based `SerialConnection`
//! - `clock`: `Instant`-backed `Clock`
//! - `log_sink`: `DiagnosticSink` that writes through the `log` facade
//! - `mock_stage`: simulated controller for development without hardware
//!
//! `host_session` wires a session to the host clock and the `log` sink.

pub mod clock;
pub mod log_sink;
pub mod mock_stage;
pub mod serial_port;

pub use clock::MonotonicClock;
pub use log_sink::LogSink;
pub use mock_stage::{MockStage, MockStageHandle};
pub use serial_port::{SerialPortConnection, SerialPortFactory};

use crate::domain::{Configuration, Smc100Result};
use crate::ports::SerialConnection;
use crate::smc::Smc100;

/// Session timed by the host's monotonic clock, reporting faults through `log`.
pub fn host_session(
    serial: Box<dyn SerialConnection>,
    config: Configuration,
) -> Smc100Result<Smc100> {
    Smc100::new(
        serial,
        Box::new(MonotonicClock::new()),
        Box::new(LogSink),
        config,
    )
}
