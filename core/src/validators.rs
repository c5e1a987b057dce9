//! Request validation performed before any I/O.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error types for request validation
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Account ids are opaque positive integers.
    #[error("account_id must be a positive integer")]
    AccountIdNotPositive,
    /// Time ranges must be ordered.
    #[error("start must be before end")]
    StartAfterEnd,
}

/// Reject non-positive account ids.
pub fn validate_account_id(account_id: i64) -> Result<(), ValidationError> {
    if account_id <= 0 {
        return Err(ValidationError::AccountIdNotPositive);
    }
    Ok(())
}

/// Reject inverted time ranges; open-ended ranges are fine.
pub fn validate_time_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::StartAfterEnd);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::time::parse_timestamp;

    #[test]
    fn account_id_must_be_positive() {
        assert_eq!(
            validate_account_id(0),
            Err(ValidationError::AccountIdNotPositive)
        );
        assert_eq!(
            validate_account_id(-7),
            Err(ValidationError::AccountIdNotPositive)
        );
        assert_eq!(validate_account_id(1), Ok(()));
    }

    #[test]
    fn time_range_must_be_ordered() {
        let earlier = parse_timestamp("2026-02-20T11:59:00Z");
        let later = parse_timestamp("2026-02-20T12:00:00Z");

        assert_eq!(validate_time_range(later, earlier), Err(ValidationError::StartAfterEnd));
        assert_eq!(validate_time_range(earlier, later), Ok(()));
        assert_eq!(validate_time_range(earlier, earlier), Ok(()));
        assert_eq!(validate_time_range(None, later), Ok(()));
        assert_eq!(validate_time_range(earlier, None), Ok(()));
    }
}
