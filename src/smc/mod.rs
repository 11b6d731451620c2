//! SMC100 command layer.
//!
//! This module separates the concerns of talking to the controller:
//! - the command catalog (below): mnemonic, parameter encoding and
//!   get/set capability of every logical command
//! - `queue`: fixed-capacity ring of pending user requests
//! - `encode` / `decode`: pure translation to and from wire lines
//! - `line`: bounded accumulator for one inbound reply line
//! - `status`: hardware state code → coarse `Status`
//! - `session`: the tick-driven state machine that owns all of the above
//! - `facade`: the operations callers invoke on a session
//!
//! Wire format, both directions: `<address><mnemonic>[payload]\r\n`.

pub mod decode;
pub mod encode;
pub mod facade;
pub mod line;
pub mod queue;
pub mod session;
pub mod status;

pub use decode::{decode, ReplyFrame};
pub use encode::encode;
pub use line::{LineBuffer, LineEvent};
pub use queue::CommandQueue;
pub use session::{Listener, Mode, Origin, Smc100};
pub use status::interpret_status;

/// Logical commands understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Placeholder that must never reach the wire
    Noop,
    Enable,
    Home,
    MoveAbsolute,
    MoveRelative,
    MoveEstimate,
    Configure,
    Analogue,
    GpioInput,
    Reset,
    GpioOutput,
    LimitPositive,
    LimitNegative,
    PositionAsSet,
    PositionReal,
    KeypadEnable,
    ErrorCommands,
    ErrorHardware,
}

/// How a set request renders its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    None,
    Int,
    Float,
}

/// What a command supports on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Action only, e.g. home or reset
    None,
    GetOnly,
    SetOnly,
    GetSet,
    /// The bare mnemonic is itself the query
    AlwaysGet,
}

/// What a single transmission of a command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    None,
    Get,
    Set,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::None => "plain",
            Intent::Get => "get",
            Intent::Set => "set",
        }
    }
}

/// Catalog entry for one logical command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub mnemonic: &'static str,
    pub parameter: ParameterKind,
    pub access: Access,
}

const fn entry(
    kind: CommandKind,
    mnemonic: &'static str,
    parameter: ParameterKind,
    access: Access,
) -> CommandSpec {
    CommandSpec {
        kind,
        mnemonic,
        parameter,
        access,
    }
}

impl CommandKind {
    pub const ALL: [CommandKind; 18] = [
        CommandKind::Noop,
        CommandKind::Enable,
        CommandKind::Home,
        CommandKind::MoveAbsolute,
        CommandKind::MoveRelative,
        CommandKind::MoveEstimate,
        CommandKind::Configure,
        CommandKind::Analogue,
        CommandKind::GpioInput,
        CommandKind::Reset,
        CommandKind::GpioOutput,
        CommandKind::LimitPositive,
        CommandKind::LimitNegative,
        CommandKind::PositionAsSet,
        CommandKind::PositionReal,
        CommandKind::KeypadEnable,
        CommandKind::ErrorCommands,
        CommandKind::ErrorHardware,
    ];

    /// Catalog lookup. Total over every variant.
    pub const fn spec(self) -> CommandSpec {
        use Access as A;
        use CommandKind::*;
        use ParameterKind as P;
        match self {
            Noop => entry(Noop, "  ", P::None, A::None),
            Enable => entry(Enable, "MM", P::Int, A::GetSet),
            Home => entry(Home, "OR", P::None, A::None),
            MoveAbsolute => entry(MoveAbsolute, "PA", P::Float, A::GetSet),
            MoveRelative => entry(MoveRelative, "PR", P::Float, A::GetSet),
            MoveEstimate => entry(MoveEstimate, "PT", P::Float, A::AlwaysGet),
            Configure => entry(Configure, "PW", P::Int, A::GetSet),
            Analogue => entry(Analogue, "RA", P::None, A::AlwaysGet),
            GpioInput => entry(GpioInput, "RB", P::None, A::AlwaysGet),
            Reset => entry(Reset, "RS", P::None, A::None),
            GpioOutput => entry(GpioOutput, "SB", P::Int, A::GetSet),
            LimitPositive => entry(LimitPositive, "SR", P::Float, A::GetSet),
            LimitNegative => entry(LimitNegative, "SL", P::Float, A::GetSet),
            PositionAsSet => entry(PositionAsSet, "TH", P::None, A::AlwaysGet),
            PositionReal => entry(PositionReal, "TP", P::None, A::AlwaysGet),
            KeypadEnable => entry(KeypadEnable, "JM", P::Int, A::GetSet),
            ErrorCommands => entry(ErrorCommands, "TE", P::None, A::AlwaysGet),
            ErrorHardware => entry(ErrorHardware, "TS", P::None, A::AlwaysGet),
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        self.spec().mnemonic
    }
}

/// One pending or in-flight request: a command, what it asks for, and its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub command: CommandKind,
    pub intent: Intent,
    pub parameter: f64,
}

impl Request {
    pub const fn new(command: CommandKind, parameter: f64, intent: Intent) -> Self {
        Self {
            command,
            intent,
            parameter,
        }
    }

    pub const fn get(command: CommandKind) -> Self {
        Self::new(command, 0.0, Intent::Get)
    }

    pub const fn set(command: CommandKind, parameter: f64) -> Self {
        Self::new(command, parameter, Intent::Set)
    }

    pub const fn plain(command: CommandKind) -> Self {
        Self::new(command, 0.0, Intent::None)
    }

    /// Whether the controller answers this transmission with a reply line.
    pub fn expects_reply(&self) -> bool {
        self.intent == Intent::Get || self.command.spec().access == Access::AlwaysGet
    }
}
