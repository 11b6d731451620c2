//! Pure encoding: Request → SMC100 wire line.
//!
//! No I/O, no side effects. The result includes the `\r\n` terminator and
//! is written to the port as-is.

use crate::domain::EncodeError;

use super::{Access, CommandKind, Intent, ParameterKind, Request};

/// Suffix turning a get/set command into a query.
pub const GET_CHARACTER: char = '?';

/// Encode a request addressed to controller `address`.
///
/// - get intent → `<addr><mnemonic>?`
/// - set intent → `<addr><mnemonic><value>`, integer or 6-decimal fixed point
/// - plain intent or always-get command → bare `<addr><mnemonic>`
pub fn encode(address: u8, request: &Request) -> Result<String, EncodeError> {
    let spec = request.command.spec();
    let mnemonic = spec.mnemonic;

    if spec.kind == CommandKind::Noop {
        return Err(EncodeError::EmptyCommand);
    }

    let suffix = if spec.access == Access::AlwaysGet {
        String::new()
    } else {
        match request.intent {
            Intent::Get => match spec.access {
                Access::GetOnly | Access::GetSet => GET_CHARACTER.to_string(),
                _ => return Err(unsupported(mnemonic, request.intent)),
            },
            Intent::Set => match spec.access {
                Access::SetOnly | Access::GetSet => match spec.parameter {
                    ParameterKind::Int => format!("{}", request.parameter as i64),
                    ParameterKind::Float => format!("{:.6}", request.parameter),
                    ParameterKind::None => return Err(EncodeError::MissingParameter { mnemonic }),
                },
                _ => return Err(unsupported(mnemonic, request.intent)),
            },
            Intent::None => match spec.access {
                Access::None => String::new(),
                _ => return Err(unsupported(mnemonic, request.intent)),
            },
        }
    };

    Ok(format!("{address}{mnemonic}{suffix}\r\n"))
}

fn unsupported(mnemonic: &'static str, intent: Intent) -> EncodeError {
    EncodeError::IntentNotSupported {
        mnemonic,
        intent: intent.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smc::CommandKind::*;

    #[test]
    fn encode_enable_on() {
        assert_eq!(encode(1, &Request::set(Enable, 1.0)).unwrap(), "1MM1\r\n");
    }

    #[test]
    fn encode_enable_off() {
        assert_eq!(encode(1, &Request::set(Enable, 0.0)).unwrap(), "1MM0\r\n");
    }

    #[test]
    fn encode_move_absolute_fixed_point() {
        assert_eq!(
            encode(1, &Request::set(MoveAbsolute, 10.0)).unwrap(),
            "1PA10.000000\r\n"
        );
        assert_eq!(
            encode(1, &Request::set(MoveAbsolute, -5.0)).unwrap(),
            "1PA-5.000000\r\n"
        );
    }

    #[test]
    fn encode_float_keeps_six_digits_for_large_values() {
        assert_eq!(
            encode(1, &Request::set(MoveRelative, 12345.0000004)).unwrap(),
            "1PR12345.000000\r\n"
        );
    }

    #[test]
    fn encode_limit_query() {
        assert_eq!(encode(2, &Request::get(LimitPositive)).unwrap(), "2SR?\r\n");
        assert_eq!(encode(2, &Request::get(LimitNegative)).unwrap(), "2SL?\r\n");
    }

    #[test]
    fn encode_always_get_is_bare() {
        assert_eq!(encode(1, &Request::plain(ErrorHardware)).unwrap(), "1TS\r\n");
        assert_eq!(encode(1, &Request::plain(ErrorCommands)).unwrap(), "1TE\r\n");
        assert_eq!(encode(1, &Request::plain(PositionReal)).unwrap(), "1TP\r\n");
        assert_eq!(encode(1, &Request::get(GpioInput)).unwrap(), "1RB\r\n");
    }

    #[test]
    fn encode_action_is_bare() {
        assert_eq!(encode(1, &Request::plain(Home)).unwrap(), "1OR\r\n");
        assert_eq!(encode(12, &Request::plain(Reset)).unwrap(), "12RS\r\n");
    }

    #[test]
    fn encode_gpio_output_as_integer() {
        assert_eq!(encode(1, &Request::set(GpioOutput, 5.0)).unwrap(), "1SB5\r\n");
    }

    #[test]
    fn encode_rejects_noop() {
        assert_eq!(
            encode(1, &Request::plain(Noop)),
            Err(EncodeError::EmptyCommand)
        );
    }

    #[test]
    fn encode_rejects_intent_the_command_lacks() {
        assert!(encode(1, &Request::set(Home, 1.0)).is_err());
        assert!(encode(1, &Request::get(Reset)).is_err());
        assert!(encode(1, &Request::plain(MoveAbsolute)).is_err());
    }

    #[test]
    fn float_parameters_survive_the_wire_to_six_digits() {
        for value in [0.1, -3.333333333, 25.000000499, 1e-7] {
            let wire = encode(1, &Request::set(MoveAbsolute, value)).unwrap();
            let text = wire.trim_end().trim_start_matches("1PA");
            let parsed: f64 = text.parse().unwrap();
            assert!(
                (parsed - value).abs() <= 5e-7,
                "{value} encoded as {text}"
            );
        }
    }
}
