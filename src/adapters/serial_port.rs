//! Serial port adapter using the `serialport` crate
//!
//! Implements `SerialFactory` and `SerialConnection` traits. The controller
//! speaks 8N1 with XON/XOFF handshaking. Reads are gated on
//! `bytes_to_read`, so the short port timeout is never actually waited on.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::domain::{SerialPortInfo, Smc100Error, Smc100Result};
use crate::ports::{SerialConnection, SerialFactory};

/// Zero-sized factory for creating serial port connections.
pub struct SerialPortFactory;

impl SerialFactory for SerialPortFactory {
    fn list_ports() -> Smc100Result<Vec<SerialPortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| Smc100Error::Serial(format!("Failed to list ports: {e}")))?;

        Ok(ports
            .into_iter()
            .map(|p| {
                let port_type = match &p.port_type {
                    serialport::SerialPortType::UsbPort(info) => {
                        format!("USB ({:04X}:{:04X})", info.vid, info.pid)
                    }
                    serialport::SerialPortType::PciPort => "PCI".to_string(),
                    serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                    serialport::SerialPortType::Unknown => "Native".to_string(),
                };
                SerialPortInfo {
                    name: p.port_name,
                    port_type,
                }
            })
            .collect())
    }

    fn open(port: &str, baud_rate: u32) -> Smc100Result<Box<dyn SerialConnection>> {
        let serial = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::Software)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| Smc100Error::Serial(format!("Failed to open {port}: {e}")))?;

        log::info!("Opened {port} at {baud_rate} baud (8N1, XON/XOFF)");
        Ok(Box::new(SerialPortConnection {
            port: serial,
            connected: true,
        }))
    }
}

/// An open serial port connection wrapping the `serialport` crate.
pub struct SerialPortConnection {
    port: Box<dyn serialport::SerialPort>,
    connected: bool,
}

impl SerialPortConnection {
    fn ensure_open(&self) -> Smc100Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Smc100Error::Serial("Port is closed".to_string()))
        }
    }
}

impl SerialConnection for SerialPortConnection {
    fn write(&mut self, data: &[u8]) -> Smc100Result<usize> {
        self.ensure_open()?;
        self.port
            .write_all(data)
            .map_err(|e| Smc100Error::Serial(format!("Write failed: {e}")))?;
        Ok(data.len())
    }

    fn read_byte(&mut self) -> Smc100Result<Option<u8>> {
        self.ensure_open()?;
        if self.available()? == 0 {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(Smc100Error::Serial(format!("Read failed: {e}"))),
        }
    }

    fn available(&mut self) -> Smc100Result<usize> {
        self.ensure_open()?;
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(|e| Smc100Error::Serial(format!("Failed to query input buffer: {e}")))
    }

    fn close(&mut self) -> Smc100Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
