//! Domain error types

use thiserror::Error;

/// Errors returned synchronously by ports, adapters and configuration.
#[derive(Error, Debug)]
pub enum Smc100Error {
    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for driver operations
pub type Smc100Result<T> = Result<T, Smc100Error>;

/// Reasons a queued request cannot be put on the wire.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("empty command requested")]
    EmptyCommand,

    #[error("{mnemonic} does not accept a {intent} request")]
    IntentNotSupported {
        mnemonic: &'static str,
        intent: &'static str,
    },

    #[error("{mnemonic} has no parameter encoding for a set request")]
    MissingParameter { mnemonic: &'static str },
}

/// Reasons a reply line could not be matched to the active command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("address does not match return for '{line}' (expected {expected})")]
    AddressMismatch { expected: u8, line: String },

    #[error("return string expected {expected} but received {found}")]
    MnemonicMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("reply too short to carry a mnemonic: '{line}'")]
    Truncated { line: String },
}

/// A diagnostic event raised while driving the protocol.
///
/// Faults never reach the caller of the facade. The session hands each one
/// to its `DiagnosticSink` and converges back to Idle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("error code: {code}")]
    CommandError { code: char },

    #[error("error hardware code: {code}")]
    HardwareError { code: String },

    #[error("error status code not recognized: {code}")]
    UnrecognizedStatus { code: String },

    #[error("malformed {mnemonic} payload: '{payload}'")]
    MalformedPayload {
        mnemonic: &'static str,
        payload: String,
    },

    #[error("time out detected waiting for {mnemonic}")]
    ReplyTimeout { mnemonic: &'static str },

    #[error("buffer overflow with {partial}")]
    ReplyOverflow { partial: String },

    #[error("transport failure: {0}")]
    Transport(String),
}
