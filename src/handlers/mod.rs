// Booking engine API handlers

pub mod availability;
pub mod booking;
pub mod docs;

use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};

// Booking routes: availability, holds, booking, reschedule, cancel
pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{company_id}/availability",
            get(availability::get_availability),
        )
        .route("/{company_id}/holds", post(booking::create_hold))
        .route(
            "/{company_id}/appointments",
            post(booking::book_appointment),
        )
        .route(
            "/{company_id}/appointments/{appointment_id}/reschedule",
            post(booking::reschedule_appointment),
        )
        .route(
            "/{company_id}/appointments/{appointment_id}/cancel",
            post(booking::cancel_appointment),
        )
}
