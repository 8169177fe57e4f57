// OpenAPI document for the booking API

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::models::{
    AppointmentResponse, AppointmentStatus, AvailabilityResponse, BookAppointmentRequest,
    ContactDetails, CreateHoldRequest, HoldResponse, RescheduleRequest, RescheduleResponse,
    SlotDto,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Slotly Booking API",
        description = "Availability, holds, booking, reschedule and cancel",
        version = "1.0.0"
    ),
    paths(
        crate::handlers::availability::get_availability,
        crate::handlers::booking::create_hold,
        crate::handlers::booking::book_appointment,
        crate::handlers::booking::reschedule_appointment,
        crate::handlers::booking::cancel_appointment,
    ),
    components(schemas(
        AvailabilityResponse,
        SlotDto,
        CreateHoldRequest,
        HoldResponse,
        BookAppointmentRequest,
        ContactDetails,
        AppointmentResponse,
        AppointmentStatus,
        RescheduleRequest,
        RescheduleResponse,
    )),
    tags(
        (name = "Availability", description = "Slot computation"),
        (name = "Booking", description = "Holds and appointments")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document
/// GET /api/v1/docs/openapi.json
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
