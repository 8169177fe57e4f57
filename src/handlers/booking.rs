// Booking API endpoints: holds, booking, reschedule, cancel

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app::AppState,
    models::{
        AppointmentResponse, BookAppointmentRequest, CreateHoldRequest, HoldResponse,
        RescheduleRequest, RescheduleResponse,
    },
    services::{BookingService, HoldService, RescheduleService},
};

/// Reserve a slot with a short-lived hold
/// POST /api/v1/booking/:company_id/holds
#[utoipa::path(
    post,
    path = "/v1/booking/{company_id}/holds",
    tag = "Booking",
    operation_id = "createHold",
    params(
        ("company_id" = Uuid, Path, description = "Company (tenant) ID")
    ),
    request_body = CreateHoldRequest,
    responses(
        (status = 201, description = "Hold created", body = HoldResponse),
        (status = 400, description = "Bad request - validation failed"),
        (status = 402, description = "Booking locked by billing status"),
        (status = 409, description = "Conflict - slot taken or held")
    )
)]
pub async fn create_hold(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<CreateHoldRequest>,
) -> impl IntoResponse {
    let hold_service = HoldService::new(&state);

    match hold_service
        .create_hold(company_id, &request, Utc::now())
        .await
    {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Convert a hold into a confirmed appointment
/// POST /api/v1/booking/:company_id/appointments
#[utoipa::path(
    post,
    path = "/v1/booking/{company_id}/appointments",
    tag = "Booking",
    operation_id = "bookAppointment",
    params(
        ("company_id" = Uuid, Path, description = "Company (tenant) ID")
    ),
    request_body = BookAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentResponse),
        (status = 400, description = "Bad request - validation failed"),
        (status = 402, description = "Booking locked by billing status"),
        (status = 404, description = "Hold not found"),
        (status = 409, description = "Conflict - slot taken, held, or hold already used"),
        (status = 410, description = "Hold has expired")
    )
)]
pub async fn book_appointment(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(request): Json<BookAppointmentRequest>,
) -> impl IntoResponse {
    let booking_service = BookingService::new(&state);

    match booking_service
        .commit_hold(company_id, request, Utc::now())
        .await
    {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Move an appointment to a new time
/// POST /api/v1/booking/:company_id/appointments/:appointment_id/reschedule
#[utoipa::path(
    post,
    path = "/v1/booking/{company_id}/appointments/{appointment_id}/reschedule",
    tag = "Booking",
    operation_id = "rescheduleAppointment",
    params(
        ("company_id" = Uuid, Path, description = "Company (tenant) ID"),
        ("appointment_id" = Uuid, Path, description = "Appointment to move")
    ),
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Appointment rescheduled", body = RescheduleResponse),
        (status = 400, description = "Bad request - validation failed"),
        (status = 402, description = "Booking locked by billing status"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Conflict - new slot unavailable or already cancelled")
    )
)]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path((company_id, appointment_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RescheduleRequest>,
) -> impl IntoResponse {
    let reschedule_service = RescheduleService::new(&state);

    match reschedule_service
        .reschedule(company_id, appointment_id, &request, Utc::now())
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel an appointment
/// POST /api/v1/booking/:company_id/appointments/:appointment_id/cancel
#[utoipa::path(
    post,
    path = "/v1/booking/{company_id}/appointments/{appointment_id}/cancel",
    tag = "Booking",
    operation_id = "cancelAppointment",
    params(
        ("company_id" = Uuid, Path, description = "Company (tenant) ID"),
        ("appointment_id" = Uuid, Path, description = "Appointment to cancel")
    ),
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentResponse),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Appointment already cancelled")
    )
)]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path((company_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    let booking_service = BookingService::new(&state);

    match booking_service
        .cancel(company_id, appointment_id, Utc::now())
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}
