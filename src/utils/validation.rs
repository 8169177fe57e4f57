// Validation utilities for request fields

use chrono::{DateTime, Utc};

/// Trim an optional string field, treating whitespace-only values as absent.
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Validate a half-open UTC interval and its duration in minutes.
///
/// Rejected immediately, before any side effects: inverted or empty ranges,
/// and ranges whose length is not a positive whole number of minutes.
pub fn validate_time_range(
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> Result<i64, String> {
    if end_at <= start_at {
        return Err("end_at must be after start_at".to_string());
    }

    let seconds = (end_at - start_at).num_seconds();
    if seconds % 60 != 0 {
        return Err("time range must be a whole number of minutes".to_string());
    }

    Ok(seconds / 60)
}

/// Normalize a phone number to its significant digits (keeps a leading `+`).
/// Used for identity matching, not for display.
pub fn normalize_phone(phone: &str) -> String {
    let mut normalized = String::with_capacity(phone.len());
    for (i, c) in phone.chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            normalized.push(c);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_trim_optional_field() {
        assert_eq!(
            trim_optional_field(Some(&"  hi ".to_string())),
            Some("hi".to_string())
        );
        assert_eq!(trim_optional_field(Some(&"   ".to_string())), None);
        assert_eq!(trim_optional_field(None), None);
    }

    #[test]
    fn test_validate_time_range() {
        let start = Utc::now();
        assert_eq!(
            validate_time_range(start, start + Duration::minutes(30)),
            Ok(30)
        );
        assert!(validate_time_range(start, start).is_err());
        assert!(validate_time_range(start, start - Duration::minutes(5)).is_err());
        assert!(validate_time_range(start, start + Duration::seconds(90)).is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+49 (30) 1234-5678"), "+493012345678");
        assert_eq!(normalize_phone("030 1234 5678"), "03012345678");
        assert_eq!(normalize_phone("1+2"), "12");
    }
}
