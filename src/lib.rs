//! SMC100 stage controller driver
//!
//! A non-blocking driver for single-axis motion controllers that speak the
//! SMC100 ASCII serial protocol. The caller owns the loop: it enqueues
//! operations on an `Smc100` session and calls `tick()` repeatedly; results
//! arrive through completion listeners and the device snapshot.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions for the serial line, clock and diagnostics
//! - `smc/` - Protocol logic (command catalog, queue, codec, session)
//! - `adapters/` - Implementations of ports (serialport, host clock, log sink,
//!   simulator) and `host_session`, which wires them into a session
//! - `profiles` - Configuration profile persistence

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;
pub mod smc;

// Adapters (external I/O)
pub mod adapters;
pub mod profiles;

pub use domain::{Configuration, DeviceSnapshot, Fault, Smc100Error, Smc100Result, Status};
pub use smc::{CommandKind, Intent, Smc100};
