//! Smc100: the tick-driven session that owns the serial connection and
//! everything known about the stage.
//!
//! Nothing here blocks. The caller invokes `tick()` in its own loop; each
//! tick advances the state machine by at most one step:
//!
//! - `Idle`: pull the next user request from the queue and transmit it, or
//!   report all-complete once the queue drains
//! - `WaitAfterSendingCommand`: a set with no reply is settling; when the
//!   settle interval passes, poll the controller's command error register
//! - `WaitForCommandReply`: accumulate one reply line, then decode it
//!
//! A decoded reply either finishes the exchange or continues it by
//! transmitting an internal follow-up request (error query, hardware status,
//! position read). Follow-ups never pass through the user queue.

use crate::domain::{Configuration, DeviceSnapshot, Fault, Smc100Result, Status};
use crate::ports::{Clock, DiagnosticSink, SerialConnection};

use super::{
    decode, encode, interpret_status, CommandKind, CommandQueue, Intent, LineBuffer, LineEvent,
    Request,
};

/// Payload of a `TE` reply when the last command was accepted.
pub const NO_ERROR_CHARACTER: char = '@';

/// Queued by `start()` so limits, status and inputs are known before any move.
const PRIMING: [Request; 4] = [
    Request::plain(CommandKind::ErrorHardware),
    Request::get(CommandKind::LimitPositive),
    Request::get(CommandKind::LimitNegative),
    Request::plain(CommandKind::GpioInput),
];

/// Completion callback, invoked synchronously from inside `tick()`.
pub type Listener = Box<dyn FnMut() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Inactive,
    Idle,
    WaitAfterSendingCommand,
    WaitForCommandReply,
}

/// Where the in-flight request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Chained,
}

/// The single request currently on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveCommand {
    pub request: Request,
    pub origin: Origin,
}

/// What a decoded reply asks the session to do next.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Continuation {
    Finish,
    Chain(Request),
}

#[derive(Default)]
pub(super) struct Listeners {
    pub(super) all_complete: Option<Listener>,
    pub(super) move_complete: Option<Listener>,
    pub(super) home_complete: Option<Listener>,
    pub(super) gpio_read: Option<Listener>,
}

fn fire(listener: &mut Option<Listener>) {
    if let Some(callback) = listener.as_mut() {
        callback();
    }
}

/// Driver session for one controller on one serial connection.
pub struct Smc100 {
    serial: Box<dyn SerialConnection>,
    clock: Box<dyn Clock>,
    sink: Box<dyn DiagnosticSink>,
    config: Configuration,
    mode: Mode,
    queue: CommandQueue,
    active: Option<ActiveCommand>,
    line: LineBuffer,
    snapshot: DeviceSnapshot,
    pending_move: bool,
    pending_home: bool,
    transmit_time: u64,
    last_wipe: u64,
    listeners: Listeners,
}

impl Smc100 {
    /// Build an inactive session around a connection, a time source and a
    /// fault sink.
    pub fn new(
        serial: Box<dyn SerialConnection>,
        clock: Box<dyn Clock>,
        sink: Box<dyn DiagnosticSink>,
        config: Configuration,
    ) -> Smc100Result<Self> {
        config.validate()?;
        Ok(Self {
            serial,
            clock,
            sink,
            queue: CommandQueue::new(config.queue_capacity),
            line: LineBuffer::new(config.reply_buffer_size),
            config,
            mode: Mode::Inactive,
            active: None,
            snapshot: DeviceSnapshot::default(),
            pending_move: false,
            pending_home: false,
            transmit_time: 0,
            last_wipe: 0,
            listeners: Listeners::default(),
        })
    }

    /// Leave `Inactive` and queue the priming reads.
    ///
    /// Requests enqueued before startup are kept and run after priming. If
    /// they no longer fit beside the priming reads, the oldest are dropped.
    pub fn start(&mut self) {
        if self.mode != Mode::Inactive {
            log::debug!("session for address {} already started", self.config.address);
            return;
        }
        let mut waiting = self.queue.drain();
        let room = self.queue.capacity().saturating_sub(PRIMING.len());
        if waiting.len() > room {
            let dropped: Vec<_> = waiting.drain(..waiting.len() - room).collect();
            log::debug!(
                "dropped {} request(s) queued before startup to make room for priming",
                dropped.len()
            );
        }
        for request in PRIMING.into_iter().chain(waiting) {
            self.queue.enqueue(request);
        }
        self.last_wipe = self.clock.now_micros();
        self.mode = Mode::Idle;
    }

    /// Advance the state machine by one step. Never blocks.
    pub fn tick(&mut self) {
        match self.mode {
            Mode::Inactive => {}
            Mode::Idle => self.check_queue(),
            Mode::WaitAfterSendingCommand => self.check_wait_after_sending(),
            Mode::WaitForCommandReply => self.check_for_reply(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn active(&self) -> Option<ActiveCommand> {
        self.active
    }

    pub fn snapshot(&self) -> &DeviceSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Number of user requests still waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.count()
    }

    /// Close the underlying connection. The session stays usable only after
    /// the caller hands it a new one, so it drops back to `Inactive`.
    pub fn close(&mut self) -> Smc100Result<()> {
        self.mode = Mode::Inactive;
        self.active = None;
        self.cancel_pending_motion();
        self.serial.close()
    }

    pub(super) fn push_request(&mut self, request: Request) {
        self.queue.enqueue(request);
    }

    pub(super) fn stage_gpio_output(&mut self, bits: u8) {
        self.snapshot.gpio_output = bits;
    }

    pub(super) fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    fn check_queue(&mut self) {
        if let Some(request) = self.queue.dequeue() {
            self.snapshot.busy = true;
            self.transmit(ActiveCommand {
                request,
                origin: Origin::User,
            });
            return;
        }

        if self.snapshot.busy {
            self.snapshot.busy = false;
            fire(&mut self.listeners.all_complete);
        }
        self.wipe_stray_input();
    }

    /// Drop one unread byte every wipe interval so a desynchronised reply
    /// cannot sit in the port forever.
    fn wipe_stray_input(&mut self) {
        let now = self.clock.now_micros();
        if now.saturating_sub(self.last_wipe) <= self.config.timing.wipe_interval_us {
            return;
        }
        self.last_wipe = now;
        let read = match self.serial.available() {
            Ok(0) => return,
            Ok(_) => self.serial.read_byte(),
            Err(e) => Err(e),
        };
        match read {
            Ok(Some(byte)) => log::trace!("discarded stray byte {byte:#04x}"),
            Ok(None) => {}
            Err(e) => self.report(Fault::Transport(e.to_string())),
        }
    }

    fn check_wait_after_sending(&mut self) {
        if let Some(line) = self.poll_line() {
            self.handle_reply(&line);
            return;
        }
        if self.mode != Mode::WaitAfterSendingCommand {
            return;
        }
        if self.elapsed_since_transmit() > self.config.timing.settle_timeout_us {
            self.chain(Request::plain(CommandKind::ErrorCommands));
        }
    }

    fn check_for_reply(&mut self) {
        if let Some(line) = self.poll_line() {
            self.handle_reply(&line);
            return;
        }
        if self.mode != Mode::WaitForCommandReply {
            return;
        }
        if self.elapsed_since_transmit() > self.config.timing.reply_timeout_us {
            let mnemonic = self
                .active
                .map(|active| active.request.command.mnemonic())
                .unwrap_or("--");
            self.abandon(Fault::ReplyTimeout { mnemonic });
        }
    }

    /// Pull whatever bytes are buffered into the line accumulator, stopping
    /// at the first complete line. Overflow and transport failures abandon
    /// the exchange.
    fn poll_line(&mut self) -> Option<String> {
        loop {
            match self.serial.available() {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.abandon(Fault::Transport(e.to_string()));
                    return None;
                }
            }
            let byte = match self.serial.read_byte() {
                Ok(Some(byte)) => byte,
                Ok(None) => return None,
                Err(e) => {
                    self.abandon(Fault::Transport(e.to_string()));
                    return None;
                }
            };
            match self.line.push(byte) {
                LineEvent::Pending => {}
                LineEvent::Complete(line) if line.is_empty() => {}
                LineEvent::Complete(line) => {
                    log::debug!("SMC RX: {line}");
                    return Some(line);
                }
                LineEvent::Overflow(partial) => {
                    self.abandon(Fault::ReplyOverflow { partial });
                    return None;
                }
            }
        }
    }

    fn handle_reply(&mut self, line: &str) {
        let Some(active) = self.active else {
            self.finish();
            return;
        };
        let frame = match decode(line, self.config.address, active.request.command) {
            Ok(frame) => frame,
            Err(e) => {
                self.abandon(e.into());
                return;
            }
        };
        match self.apply_reply(&active, frame.payload) {
            Continuation::Finish => self.finish(),
            Continuation::Chain(request) => self.chain(request),
        }
    }

    /// Fold a matched reply into the snapshot and decide what comes next.
    fn apply_reply(&mut self, active: &ActiveCommand, payload: &str) -> Continuation {
        let command = active.request.command;
        let error_query = Continuation::Chain(Request::plain(CommandKind::ErrorCommands));

        match command {
            CommandKind::PositionReal => {
                let Some(position) = parse_number(payload) else {
                    return self.malformed(command, payload);
                };
                self.snapshot.position = position;
                if self.pending_move {
                    self.pending_move = false;
                    fire(&mut self.listeners.move_complete);
                }
                if self.pending_home {
                    self.pending_home = false;
                    fire(&mut self.listeners.home_complete);
                }
                Continuation::Finish
            }
            CommandKind::ErrorCommands => match payload.chars().next() {
                Some(NO_ERROR_CHARACTER) => {
                    Continuation::Chain(Request::plain(CommandKind::ErrorHardware))
                }
                Some(code) => {
                    self.cancel_pending_motion();
                    self.report(Fault::CommandError { code });
                    Continuation::Finish
                }
                None => self.malformed(command, payload),
            },
            CommandKind::ErrorHardware => self.apply_hardware_status(payload),
            CommandKind::GpioInput => {
                let Some(bits) = payload.trim().parse::<u8>().ok() else {
                    return self.malformed(command, payload);
                };
                self.snapshot.gpio_input = bits;
                fire(&mut self.listeners.gpio_read);
                error_query
            }
            CommandKind::Analogue => {
                let Some(reading) = parse_number(payload) else {
                    return self.malformed(command, payload);
                };
                self.snapshot.analogue = reading;
                error_query
            }
            CommandKind::LimitNegative | CommandKind::LimitPositive => {
                if active.request.intent != Intent::Get {
                    return Continuation::Chain(Request::get(command));
                }
                let Some(limit) = parse_number(payload) else {
                    return self.malformed(command, payload);
                };
                if command == CommandKind::LimitNegative {
                    self.snapshot.limits.negative = limit;
                } else {
                    self.snapshot.limits.positive = limit;
                }
                error_query
            }
            _ => error_query,
        }
    }

    /// `TS` payload: four hex digits of error flags, then the two-character state.
    fn apply_hardware_status(&mut self, payload: &str) -> Continuation {
        let (Some(code), Some(state)) = (payload.get(..4), payload.get(4..6)) else {
            return self.malformed(CommandKind::ErrorHardware, payload);
        };

        let hardware_fault = code.chars().any(|c| c != '0');
        if hardware_fault {
            self.report(Fault::HardwareError {
                code: code.to_string(),
            });
        }

        let status = interpret_status(state);
        self.snapshot.status = status;
        let next = match status {
            Status::Error => {
                self.report(Fault::UnrecognizedStatus {
                    code: state.to_string(),
                });
                self.cancel_pending_motion();
                return Continuation::Finish;
            }
            Status::NoReference => {
                self.snapshot.homed = false;
                Continuation::Finish
            }
            Status::Homing => {
                self.snapshot.homed = false;
                Continuation::Chain(Request::plain(CommandKind::ErrorHardware))
            }
            Status::Moving => {
                self.snapshot.homed = true;
                Continuation::Chain(Request::plain(CommandKind::ErrorHardware))
            }
            Status::Ready => {
                self.snapshot.homed = true;
                Continuation::Chain(Request::plain(CommandKind::PositionReal))
            }
            Status::Disabled | Status::Jogging | Status::Unknown => Continuation::Finish,
        };

        let next = if hardware_fault {
            Continuation::Finish
        } else {
            next
        };
        // Only a Ready status goes on to the position read that completes motion
        if next == Continuation::Finish {
            self.cancel_pending_motion();
        }
        next
    }

    fn malformed(&mut self, command: CommandKind, payload: &str) -> Continuation {
        self.report(Fault::MalformedPayload {
            mnemonic: command.mnemonic(),
            payload: payload.to_string(),
        });
        self.cancel_pending_motion();
        Continuation::Finish
    }

    /// Forget an in-flight move or home whose confirm sequence was cut short.
    fn cancel_pending_motion(&mut self) {
        if self.pending_move || self.pending_home {
            log::debug!(
                "cancelled pending completion (move {}, home {})",
                self.pending_move,
                self.pending_home
            );
        }
        self.pending_move = false;
        self.pending_home = false;
    }

    fn chain(&mut self, request: Request) {
        self.transmit(ActiveCommand {
            request,
            origin: Origin::Chained,
        });
    }

    fn transmit(&mut self, command: ActiveCommand) {
        let request = command.request;
        let wire = match encode(self.config.address, &request) {
            Ok(wire) => wire,
            Err(e) => {
                self.abandon(e.into());
                return;
            }
        };

        log::debug!("SMC TX: {}", wire.trim_end());
        if let Err(e) = self.serial.write(wire.as_bytes()) {
            self.abandon(Fault::Transport(e.to_string()));
            return;
        }

        self.line.clear();
        self.transmit_time = self.clock.now_micros();

        match request.command {
            CommandKind::MoveAbsolute | CommandKind::MoveRelative
                if request.intent == Intent::Set =>
            {
                self.pending_move = true;
            }
            CommandKind::Home => self.pending_home = true,
            _ => {}
        }

        self.mode = if request.expects_reply() {
            Mode::WaitForCommandReply
        } else {
            Mode::WaitAfterSendingCommand
        };
        self.active = Some(command);
    }

    fn elapsed_since_transmit(&self) -> u64 {
        self.clock.now_micros().saturating_sub(self.transmit_time)
    }

    fn report(&mut self, fault: Fault) {
        self.sink.report(&fault);
    }

    fn abandon(&mut self, fault: Fault) {
        self.report(fault);
        self.cancel_pending_motion();
        self.finish();
    }

    fn finish(&mut self) {
        self.active = None;
        self.mode = Mode::Idle;
    }
}

fn parse_number(payload: &str) -> Option<f64> {
    payload.trim().parse::<f64>().ok()
}
