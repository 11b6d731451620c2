//! Pure decoding: one reply line → (address, mnemonic, payload).
//!
//! No I/O, no side effects. The controller echoes the mnemonic it is
//! answering, so the active command tells us what the line must start with.
//! What the payload means is left to the session.

use crate::domain::DecodeError;

use super::CommandKind;

/// A reply line split into its fields. Borrows from the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplyFrame<'a> {
    pub address: u8,
    pub mnemonic: &'a str,
    pub payload: &'a str,
}

/// Decode a reply line (terminators already stripped) against the address
/// this driver talks to and the command currently in flight.
pub fn decode(line: &str, address: u8, expected: CommandKind) -> Result<ReplyFrame<'_>, DecodeError> {
    let trimmed = line.trim_start();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());

    let parsed = trimmed[..digits_end].parse::<u8>().ok();
    if parsed != Some(address) {
        return Err(DecodeError::AddressMismatch {
            expected: address,
            line: line.to_string(),
        });
    }

    let rest = &trimmed[digits_end..];
    let Some(mnemonic) = rest.get(..2) else {
        return Err(DecodeError::Truncated {
            line: line.to_string(),
        });
    };

    let wanted = expected.mnemonic();
    if mnemonic != wanted {
        return Err(DecodeError::MnemonicMismatch {
            expected: wanted,
            found: mnemonic.to_string(),
        });
    }

    Ok(ReplyFrame {
        address,
        mnemonic,
        payload: &rest[2..],
    })
}
