//! Numeric record identifiers.
//!
//! All persisted records use positive integer ids. Path parameters arrive as
//! strings and must be parsed with [`parse_id`] so that a malformed or
//! non-positive id fails as invalid input rather than an accidental 404.

use crate::error::{CoreError, Result};

pub type UserId = i64;
pub type PatientId = i64;
pub type PsychologistId = i64;
pub type SessionId = i64;
pub type TransferId = i64;
pub type AuditEntryId = i64;

/// Parse a raw path segment into a record id.
///
/// Accepts only strictly positive integers; everything else is rejected.
pub fn parse_id(raw: &str) -> Result<i64> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::invalid_id(raw))?;
    if id <= 0 {
        return Err(CoreError::invalid_id(raw));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_integers() {
        assert_eq!(parse_id("1").unwrap(), 1);
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id(" 7 ").unwrap(), 7);
    }

    #[test]
    fn rejects_zero_and_negatives() {
        assert!(parse_id("0").is_err());
        assert!(parse_id("-5").is_err());
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
        assert!(parse_id("12abc").is_err());
        assert!(parse_id("1.5").is_err());
    }
}
