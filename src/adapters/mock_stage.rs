//! Simulated stage controller for development and testing without hardware.
//!
//! Run the CLI with `--mock` to talk to it:
//!
//!   RUST_LOG=smc100_lib=info smc100 --mock home
//!
//! The simulator parses every line the driver writes, logs it at INFO level,
//! and queues the reply a real controller would send. Moves and homing take
//! a few status polls to finish so the driver's chaining is exercised.
//! A `MockStageHandle` shares the simulated state with the test that owns
//! the session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{Smc100Error, Smc100Result};
use crate::ports::SerialConnection;

const STATE_NOT_REFERENCED: &str = "0A";
const STATE_HOMING: &str = "1E";
const STATE_MOVING: &str = "28";
const STATE_READY_FROM_HOMING: &str = "32";
const STATE_READY_FROM_MOVING: &str = "33";
const STATE_DISABLED: &str = "3C";

/// Status polls a move or home reports before it finishes.
pub const MOTION_POLLS: u32 = 2;

/// Command error codes as the controller reports them through `TE`.
const ERR_NONE: char = '@';
const ERR_UNKNOWN_COMMAND: char = 'A';
const ERR_OUT_OF_LIMITS: char = 'C';
const ERR_NOT_REFERENCED: char = 'H';

#[derive(Debug, Clone, Copy)]
struct Motion {
    target: f64,
    polls_left: u32,
    homing: bool,
}

/// Everything the simulated controller knows.
#[derive(Debug)]
pub struct StageModel {
    pub address: u8,
    pub position: f64,
    pub limit_negative: f64,
    pub limit_positive: f64,
    pub gpio_input: u8,
    pub gpio_output: u8,
    pub analogue: f64,
    pub hardware_error: u16,
    pub homed: bool,
    pub enabled: bool,
    /// Every command line received, without terminators.
    pub received: Vec<String>,
    state: &'static str,
    last_error: char,
    motion: Option<Motion>,
}

impl StageModel {
    fn new(address: u8) -> Self {
        Self {
            address,
            position: 0.0,
            limit_negative: -25.0,
            limit_positive: 25.0,
            gpio_input: 0,
            gpio_output: 0,
            analogue: 0.0,
            hardware_error: 0,
            homed: false,
            enabled: true,
            received: Vec::new(),
            state: STATE_NOT_REFERENCED,
            last_error: ERR_NONE,
            motion: None,
        }
    }

    pub fn state_code(&self) -> &'static str {
        self.state
    }

    /// Handle one command line and return the reply line, if any.
    fn execute(&mut self, line: &str) -> Option<String> {
        self.received.push(line.to_string());

        let digits_end = line
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(line.len());
        if line[..digits_end].parse::<u8>().ok() != Some(self.address) {
            log::info!("[MOCK STAGE] ignoring '{line}' (not address {})", self.address);
            return None;
        }
        let rest = &line[digits_end..];
        let (Some(mnemonic), Some(argument)) = (rest.get(..2), rest.get(2..)) else {
            self.last_error = ERR_UNKNOWN_COMMAND;
            return None;
        };
        let query = argument == "?";
        let value = argument.parse::<f64>().ok();
        let address = self.address;
        let reply = move |payload: String| Some(format!("{address}{mnemonic}{payload}"));

        match (mnemonic, query, value) {
            ("TE", _, _) => {
                let code = std::mem::replace(&mut self.last_error, ERR_NONE);
                log::info!("[MOCK STAGE] TE → {code}");
                reply(code.to_string())
            }
            ("TS", _, _) => {
                self.advance_motion();
                log::info!(
                    "[MOCK STAGE] TS → {:04X}{}",
                    self.hardware_error,
                    self.state
                );
                reply(format!("{:04X}{}", self.hardware_error, self.state))
            }
            ("TP", _, _) => reply(format!("{:.6}", self.position)),
            ("TH", _, _) => {
                let target = self.motion.map_or(self.position, |m| m.target);
                reply(format!("{target:.6}"))
            }
            ("RB", _, _) => reply(self.gpio_input.to_string()),
            ("RA", _, _) => reply(format!("{:.6}", self.analogue)),
            ("PT", _, _) => {
                let distance = self.motion.map_or(0.0, |m| (m.target - self.position).abs());
                reply(format!("{distance:.6}"))
            }
            ("OR", false, None) => {
                log::info!("[MOCK STAGE] HOME");
                self.start_motion(0.0, true);
                None
            }
            ("RS", false, None) => {
                log::info!("[MOCK STAGE] RESET");
                self.motion = None;
                self.homed = false;
                self.enabled = true;
                self.state = STATE_NOT_REFERENCED;
                None
            }
            ("MM", true, _) => reply(self.state.to_string()),
            ("MM", false, Some(v)) => {
                self.enabled = v != 0.0;
                log::info!("[MOCK STAGE] ENABLE {}", self.enabled);
                if self.homed {
                    self.state = if self.enabled {
                        STATE_READY_FROM_MOVING
                    } else {
                        STATE_DISABLED
                    };
                }
                None
            }
            ("PA", true, _) => reply(format!("{:.6}", self.position)),
            ("PA", false, Some(target)) => {
                self.request_move(target);
                None
            }
            ("PR", false, Some(delta)) => {
                self.request_move(self.position + delta);
                None
            }
            ("SL", true, _) => reply(self.limit_negative.to_string()),
            ("SL", false, Some(v)) => {
                self.limit_negative = v;
                None
            }
            ("SR", true, _) => reply(self.limit_positive.to_string()),
            ("SR", false, Some(v)) => {
                self.limit_positive = v;
                None
            }
            ("SB", true, _) => reply(self.gpio_output.to_string()),
            ("SB", false, Some(v)) => {
                self.gpio_output = v as u8;
                log::info!("[MOCK STAGE] GPIO OUT → {:04b}", self.gpio_output);
                None
            }
            _ => {
                log::info!("[MOCK STAGE] unsupported '{line}'");
                self.last_error = ERR_UNKNOWN_COMMAND;
                None
            }
        }
    }

    fn request_move(&mut self, target: f64) {
        if !self.homed {
            self.last_error = ERR_NOT_REFERENCED;
            return;
        }
        if target < self.limit_negative || target > self.limit_positive {
            self.last_error = ERR_OUT_OF_LIMITS;
            return;
        }
        log::info!("[MOCK STAGE] MOVE {:.6} → {target:.6}", self.position);
        self.start_motion(target, false);
    }

    fn start_motion(&mut self, target: f64, homing: bool) {
        self.state = if homing { STATE_HOMING } else { STATE_MOVING };
        self.motion = Some(Motion {
            target,
            polls_left: MOTION_POLLS,
            homing,
        });
    }

    fn advance_motion(&mut self) {
        let Some(mut motion) = self.motion else {
            return;
        };
        if motion.polls_left > 0 {
            motion.polls_left -= 1;
            self.motion = Some(motion);
            return;
        }
        self.position = motion.target;
        self.motion = None;
        if motion.homing {
            self.homed = true;
            self.state = STATE_READY_FROM_HOMING;
        } else {
            self.state = STATE_READY_FROM_MOVING;
        }
    }
}

/// Shared view of a running simulator.
#[derive(Clone)]
pub struct MockStageHandle(Arc<Mutex<StageModel>>);

impl MockStageHandle {
    /// Lock the model for inspection or to change inputs.
    pub fn model(&self) -> MutexGuard<'_, StageModel> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// In-memory `SerialConnection` backed by a simulated controller.
pub struct MockStage {
    model: Arc<Mutex<StageModel>>,
    inbound_line: Vec<u8>,
    outbound: VecDeque<u8>,
    connected: bool,
}

impl MockStage {
    pub fn new(address: u8) -> Self {
        log::info!("[MOCK STAGE] Initialized at address {address}, not referenced");
        Self {
            model: Arc::new(Mutex::new(StageModel::new(address))),
            inbound_line: Vec::new(),
            outbound: VecDeque::new(),
            connected: true,
        }
    }

    pub fn handle(&self) -> MockStageHandle {
        MockStageHandle(Arc::clone(&self.model))
    }

    fn ensure_open(&self) -> Smc100Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Smc100Error::Serial("Mock stage is closed".to_string()))
        }
    }

    fn accept(&mut self, byte: u8) {
        match byte {
            b'\r' => {}
            b'\n' => {
                let line = String::from_utf8_lossy(&self.inbound_line).into_owned();
                self.inbound_line.clear();
                let reply = self
                    .model
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .execute(&line);
                if let Some(reply) = reply {
                    self.outbound.extend(reply.bytes());
                    self.outbound.extend(b"\r\n");
                }
            }
            _ => self.inbound_line.push(byte),
        }
    }
}

impl SerialConnection for MockStage {
    fn write(&mut self, data: &[u8]) -> Smc100Result<usize> {
        self.ensure_open()?;
        for &byte in data {
            self.accept(byte);
        }
        Ok(data.len())
    }

    fn read_byte(&mut self) -> Smc100Result<Option<u8>> {
        self.ensure_open()?;
        Ok(self.outbound.pop_front())
    }

    fn available(&mut self) -> Smc100Result<usize> {
        self.ensure_open()?;
        Ok(self.outbound.len())
    }

    fn close(&mut self) -> Smc100Result<()> {
        log::info!("[MOCK STAGE] closed");
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(stage: &mut MockStage, line: &str) -> String {
        stage.write(line.as_bytes()).unwrap();
        let mut reply = Vec::new();
        while let Some(byte) = stage.read_byte().unwrap() {
            reply.push(byte);
        }
        String::from_utf8(reply).unwrap()
    }

    #[test]
    fn starts_not_referenced() {
        let mut stage = MockStage::new(1);
        assert_eq!(exchange(&mut stage, "1TS\r\n"), "1TS00000A\r\n");
    }

    #[test]
    fn limit_query_replies_with_value() {
        let mut stage = MockStage::new(1);
        assert_eq!(exchange(&mut stage, "1SR?\r\n"), "1SR25\r\n");
        assert_eq!(exchange(&mut stage, "1SL-3.500000\r\n"), "");
        assert_eq!(exchange(&mut stage, "1SL?\r\n"), "1SL-3.5\r\n");
    }

    #[test]
    fn move_before_home_sets_command_error() {
        let mut stage = MockStage::new(1);
        assert_eq!(exchange(&mut stage, "1PA5.000000\r\n"), "");
        assert_eq!(exchange(&mut stage, "1TE\r\n"), "1TEH\r\n");
        assert_eq!(exchange(&mut stage, "1TE\r\n"), "1TE@\r\n");
    }

    #[test]
    fn home_reports_homing_then_ready() {
        let mut stage = MockStage::new(1);
        exchange(&mut stage, "1OR\r\n");
        assert_eq!(exchange(&mut stage, "1TS\r\n"), "1TS00001E\r\n");
        assert_eq!(exchange(&mut stage, "1TS\r\n"), "1TS00001E\r\n");
        assert_eq!(exchange(&mut stage, "1TS\r\n"), "1TS000032\r\n");
        assert!(stage.handle().model().homed);
    }

    #[test]
    fn other_addresses_are_ignored() {
        let mut stage = MockStage::new(2);
        assert_eq!(exchange(&mut stage, "1TP\r\n"), "");
        assert_eq!(exchange(&mut stage, "2TP\r\n"), "2TP0.000000\r\n");
    }

    #[test]
    fn closed_stage_refuses_io() {
        let mut stage = MockStage::new(1);
        stage.close().unwrap();
        assert!(stage.write(b"1TP\r\n").is_err());
        assert!(!stage.is_connected());
    }
}
