//! Hardware state code → coarse `Status`.
//!
//! The last two characters of a `TS` reply are the controller state. Only
//! the codes below are defined; anything else maps to `Status::Error`.

use crate::domain::Status;

/// Single source of truth for state code ↔ coarse status mapping.
pub const STATUS_TABLE: &[(&str, Status)] = &[
    ("0A", Status::NoReference),
    ("0B", Status::NoReference),
    ("0C", Status::NoReference),
    ("0D", Status::NoReference),
    ("0E", Status::NoReference),
    ("0F", Status::NoReference),
    ("10", Status::NoReference),
    ("11", Status::NoReference),
    ("14", Status::NoReference),
    ("1E", Status::Homing),
    ("1F", Status::Homing),
    ("28", Status::Moving),
    ("32", Status::Ready),
    ("33", Status::Ready),
    ("34", Status::Ready),
    ("35", Status::Ready),
    ("3C", Status::Disabled),
    ("3D", Status::Disabled),
    ("3E", Status::Disabled),
    ("46", Status::Jogging),
    ("47", Status::Jogging),
];

pub fn interpret_status(code: &str) -> Status {
    STATUS_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, status)| *status)
        .unwrap_or(Status::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_their_status() {
        assert_eq!(interpret_status("0A"), Status::NoReference);
        assert_eq!(interpret_status("1E"), Status::Homing);
        assert_eq!(interpret_status("28"), Status::Moving);
        assert_eq!(interpret_status("33"), Status::Ready);
        assert_eq!(interpret_status("3C"), Status::Disabled);
        assert_eq!(interpret_status("47"), Status::Jogging);
    }

    #[test]
    fn unknown_codes_map_to_error_not_unknown() {
        assert_eq!(interpret_status("ZZ"), Status::Error);
        assert_eq!(interpret_status("12"), Status::Error);
        assert_eq!(interpret_status(""), Status::Error);
        assert_eq!(interpret_status("0a"), Status::Error);
    }

    #[test]
    fn table_never_yields_unknown_or_error() {
        for (code, status) in STATUS_TABLE {
            assert_ne!(*status, Status::Unknown, "{code}");
            assert_ne!(*status, Status::Error, "{code}");
        }
    }
}
