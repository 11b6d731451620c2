//! Serial port traits
//!
//! Split into two traits:
//! - `SerialFactory`: static methods for listing and opening ports
//! - `SerialConnection`: non-blocking byte I/O on an open port

use crate::domain::{Smc100Result, SerialPortInfo};

/// Factory for creating serial connections.
pub trait SerialFactory {
    /// List available serial ports on the system
    fn list_ports() -> Smc100Result<Vec<SerialPortInfo>>;

    /// Open a serial port at the given baud rate, returning a boxed connection
    fn open(port: &str, baud_rate: u32) -> Smc100Result<Box<dyn SerialConnection>>;
}

/// Trait for an open serial port connection.
///
/// None of these calls may block waiting for the device: the session only
/// reads after `available` reports buffered bytes.
pub trait SerialConnection: Send {
    /// Write bytes to the port
    fn write(&mut self, data: &[u8]) -> Smc100Result<usize>;

    /// Write a single byte
    fn write_byte(&mut self, byte: u8) -> Smc100Result<()> {
        self.write(&[byte]).map(|_| ())
    }

    /// Read one buffered byte, or `None` if nothing has arrived
    fn read_byte(&mut self) -> Smc100Result<Option<u8>>;

    /// Number of bytes waiting to be read
    fn available(&mut self) -> Smc100Result<usize>;

    /// Close the connection
    fn close(&mut self) -> Smc100Result<()>;

    /// Check if the port is still connected
    fn is_connected(&self) -> bool;
}
