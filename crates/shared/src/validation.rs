//! Common validation utilities.

use validator::ValidationError;

/// Longest entitlement window a single key or grant may carry (10 years).
pub const MAX_DURATION_DAYS: i32 = 3650;

/// Maximum length of a loader name used in download URLs.
const MAX_CHEAT_NAME_LENGTH: usize = 64;

/// Validates that a day count is within 1..=3650.
pub fn validate_duration_days(days: i32) -> Result<(), ValidationError> {
    if (1..=MAX_DURATION_DAYS).contains(&days) {
        Ok(())
    } else {
        let mut err = ValidationError::new("duration_range");
        err.message = Some("Duration must be between 1 and 3650 days".into());
        Err(err)
    }
}

/// Validates a loader name: lowercase ASCII letters, digits, `-` or `_`.
pub fn validate_cheat_name(name: &str) -> Result<(), ValidationError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_CHEAT_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("cheat_name_format");
        err.message = Some("Name must be 1-64 characters of a-z, 0-9, '-' or '_'".into());
        Err(err)
    }
}

/// Normalizes a human-entered code: surrounding whitespace removed, upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
