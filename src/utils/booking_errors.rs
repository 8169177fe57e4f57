// Booking engine error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Booking is locked: {reason}")]
    BookingLocked {
        reason: String,
        trial_ends_at: Option<DateTime<Utc>>,
    },

    #[error("Slot conflicts with an existing appointment")]
    SlotTaken,

    #[error("Slot is currently held by another visitor")]
    SlotHeld,

    #[error("Hold not found")]
    HoldNotFound,

    #[error("Hold has expired")]
    HoldExpired,

    #[error("Hold was already used")]
    HoldAlreadyUsed,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Calendar is not configured for this company")]
    CalendarNotConfigured,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    InternalError,
}

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<diesel::result::Error> for BookingError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => BookingError::AppointmentNotFound,
            _ => BookingError::DatabaseError(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(err: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors
                    .iter()
                    .map(move |e| format!("{}: {}", field, e.message.as_ref().unwrap_or(&e.code)))
            })
            .collect();

        BookingError::ValidationError(messages.join(", "))
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct BookingErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl BookingError {
    /// Get HTTP status code for error
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::ValidationError(_) => StatusCode::BAD_REQUEST,

            BookingError::BookingLocked { .. } => StatusCode::PAYMENT_REQUIRED,

            BookingError::SlotTaken | BookingError::SlotHeld | BookingError::HoldAlreadyUsed => {
                StatusCode::CONFLICT
            },

            BookingError::AlreadyCancelled => StatusCode::CONFLICT,

            BookingError::HoldNotFound | BookingError::AppointmentNotFound => {
                StatusCode::NOT_FOUND
            },

            BookingError::HoldExpired => StatusCode::GONE,

            BookingError::CalendarNotConfigured => StatusCode::UNPROCESSABLE_ENTITY,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for API response
    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::ValidationError(_) => "VALIDATION_ERROR",
            BookingError::BookingLocked { .. } => "BOOKING_LOCKED",
            BookingError::SlotTaken => "SLOT_TAKEN",
            BookingError::SlotHeld => "SLOT_HELD",
            BookingError::HoldNotFound => "HOLD_NOT_FOUND",
            BookingError::HoldExpired => "HOLD_EXPIRED",
            BookingError::HoldAlreadyUsed => "HOLD_ALREADY_USED",
            BookingError::AppointmentNotFound => "APPOINTMENT_NOT_FOUND",
            BookingError::AlreadyCancelled => "ALREADY_CANCELLED",
            BookingError::CalendarNotConfigured => "CALENDAR_NOT_CONFIGURED",
            BookingError::DatabaseError(_) => "DATABASE_ERROR",
            BookingError::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller is expected to recover by re-fetching availability
    /// and retrying the hold/book flow.
    pub fn is_recoverable_conflict(&self) -> bool {
        matches!(
            self,
            BookingError::SlotTaken
                | BookingError::SlotHeld
                | BookingError::HoldNotFound
                | BookingError::HoldExpired
                | BookingError::HoldAlreadyUsed
        )
    }

    /// Create error response
    pub fn to_response(&self) -> BookingErrorResponse {
        let details = match self {
            BookingError::BookingLocked { trial_ends_at, .. } => Some(serde_json::json!({
                "trial_ends_at": trial_ends_at,
            })),
            BookingError::ValidationError(msg) => {
                Some(serde_json::json!({ "validation_errors": msg }))
            },
            _ => None,
        };

        BookingErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
            details,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// RESULT TYPE
// =============================================================================

pub type BookingResult<T> = Result<T, BookingError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(BookingError::SlotTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(BookingError::SlotHeld.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            BookingError::HoldNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(BookingError::HoldExpired.status_code(), StatusCode::GONE);
        assert_eq!(
            BookingError::HoldAlreadyUsed.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BookingError::BookingLocked {
                reason: "trial ended".to_string(),
                trial_ends_at: None,
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            BookingError::ValidationError("bad range".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BookingError::SlotTaken.error_code(), "SLOT_TAKEN");
        assert_eq!(BookingError::HoldAlreadyUsed.error_code(), "HOLD_ALREADY_USED");
        assert_eq!(
            BookingError::AlreadyCancelled.error_code(),
            "ALREADY_CANCELLED"
        );
    }

    #[test]
    fn test_booking_locked_carries_trial_end() {
        let ends = Utc::now();
        let error = BookingError::BookingLocked {
            reason: "Trial period has ended".to_string(),
            trial_ends_at: Some(ends),
        };

        let response = error.to_response();
        assert_eq!(response.code, "BOOKING_LOCKED");

        let details = response.details.unwrap();
        assert_eq!(
            details["trial_ends_at"],
            serde_json::to_value(ends).unwrap()
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(BookingError::SlotTaken.is_recoverable_conflict());
        assert!(BookingError::HoldExpired.is_recoverable_conflict());
        assert!(!BookingError::InternalError.is_recoverable_conflict());
        assert!(!BookingError::BookingLocked {
            reason: String::new(),
            trial_ends_at: None,
        }
        .is_recoverable_conflict());
    }

    #[test]
    fn test_from_diesel_not_found() {
        let err: BookingError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, BookingError::AppointmentNotFound));
    }
}
