// Utility modules for the booking engine

pub mod booking_errors;
pub mod validation;

pub use booking_errors::{BookingError, BookingErrorResponse, BookingResult};
pub use validation::{normalize_phone, trim_optional_field, validate_time_range};
