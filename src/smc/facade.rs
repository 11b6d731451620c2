//! Public operations on a session.
//!
//! Every action funnels into the command queue and returns immediately.
//! Success is reported only through the completion listeners; failures go
//! to the diagnostic sink. Accessors read the snapshot as last decoded.

use crate::domain::{clamp_pin, Status, TravelLimits, GPIO_WIDTH};

use super::session::{Mode, Smc100};
use super::{CommandKind, Intent, Request};

const GPIO_MASK: u8 = (1 << GPIO_WIDTH) - 1;

impl Smc100 {
    // --- Actions ---

    /// Queue any catalog command. Never blocks; a full queue drops its oldest entry.
    pub fn enqueue(&mut self, command: CommandKind, parameter: f64, intent: Intent) {
        self.push_request(Request::new(command, parameter, intent));
    }

    pub fn enable(&mut self, on: bool) {
        let value = if on { 1.0 } else { 0.0 };
        self.push_request(Request::set(CommandKind::Enable, value));
    }

    pub fn home(&mut self) {
        self.push_request(Request::plain(CommandKind::Home));
    }

    pub fn reset(&mut self) {
        self.push_request(Request::plain(CommandKind::Reset));
    }

    /// Move to `target`, clamped to the travel limits known right now.
    /// Non-finite targets are dropped.
    pub fn move_absolute(&mut self, target: f64) {
        if !target.is_finite() {
            log::warn!("ignoring absolute move to {target}");
            return;
        }
        let target = self.snapshot().limits.clamp(target);
        self.push_request(Request::set(CommandKind::MoveAbsolute, target));
    }

    /// Move by `delta`, shortened so the resulting position stays inside
    /// the known travel limits.
    pub fn move_relative(&mut self, delta: f64) {
        if !delta.is_finite() {
            log::warn!("ignoring relative move by {delta}");
            return;
        }
        let position = self.snapshot().position;
        let target = self.snapshot().limits.clamp(position + delta);
        self.push_request(Request::set(CommandKind::MoveRelative, target - position));
    }

    /// Drive one output line. Pins past the connector width act on the top bit.
    pub fn set_gpio_output(&mut self, pin: u8, on: bool) {
        let bit = 1 << clamp_pin(pin);
        let current = self.snapshot().gpio_output;
        let bits = if on { current | bit } else { current & !bit };
        self.set_gpio_output_all(bits);
    }

    pub fn set_gpio_output_all(&mut self, bits: u8) {
        let bits = bits & GPIO_MASK;
        self.stage_gpio_output(bits);
        self.push_request(Request::set(CommandKind::GpioOutput, f64::from(bits)));
    }

    pub fn request_gpio_input(&mut self) {
        self.push_request(Request::plain(CommandKind::GpioInput));
    }

    pub fn request_position(&mut self) {
        self.push_request(Request::plain(CommandKind::PositionReal));
    }

    pub fn request_analogue(&mut self) {
        self.push_request(Request::plain(CommandKind::Analogue));
    }

    pub fn request_status(&mut self) {
        self.push_request(Request::plain(CommandKind::ErrorHardware));
    }

    /// Write the negative software limit. The controller's echo triggers a re-read.
    pub fn set_limit_negative(&mut self, limit: f64) {
        self.push_request(Request::set(CommandKind::LimitNegative, limit));
        self.push_request(Request::get(CommandKind::LimitNegative));
    }

    pub fn set_limit_positive(&mut self, limit: f64) {
        self.push_request(Request::set(CommandKind::LimitPositive, limit));
        self.push_request(Request::get(CommandKind::LimitPositive));
    }

    // --- Listeners ---

    pub fn on_all_complete(&mut self, callback: impl FnMut() + Send + 'static) {
        self.listeners_mut().all_complete = Some(Box::new(callback));
    }

    pub fn on_move_complete(&mut self, callback: impl FnMut() + Send + 'static) {
        self.listeners_mut().move_complete = Some(Box::new(callback));
    }

    pub fn on_home_complete(&mut self, callback: impl FnMut() + Send + 'static) {
        self.listeners_mut().home_complete = Some(Box::new(callback));
    }

    pub fn on_gpio_read(&mut self, callback: impl FnMut() + Send + 'static) {
        self.listeners_mut().gpio_read = Some(Box::new(callback));
    }

    // --- Accessors ---

    pub fn status(&self) -> Status {
        self.snapshot().status
    }

    pub fn is_homed(&self) -> bool {
        self.snapshot().homed
    }

    pub fn is_ready(&self) -> bool {
        self.status() == Status::Ready
    }

    pub fn is_moving(&self) -> bool {
        self.status() == Status::Moving
    }

    /// Anything but an explicit `Disabled` report counts as enabled.
    pub fn is_enabled(&self) -> bool {
        self.status() != Status::Disabled
    }

    /// True from the first dequeue until the queue drains and the last
    /// exchange finishes.
    pub fn is_busy(&self) -> bool {
        self.snapshot().busy
            || matches!(
                self.mode(),
                Mode::WaitAfterSendingCommand | Mode::WaitForCommandReply
            )
    }

    pub fn position(&self) -> f64 {
        self.snapshot().position
    }

    pub fn limits(&self) -> TravelLimits {
        self.snapshot().limits
    }

    pub fn analogue_reading(&self) -> f64 {
        self.snapshot().analogue
    }

    pub fn gpio_input(&self, pin: u8) -> bool {
        self.snapshot().gpio_input & (1 << clamp_pin(pin)) != 0
    }

    pub fn gpio_output(&self, pin: u8) -> bool {
        self.snapshot().gpio_output & (1 << clamp_pin(pin)) != 0
    }
}
