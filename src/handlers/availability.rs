// Availability API endpoint

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app::AppState,
    models::{AvailabilityParams, AvailabilityResponse},
    services::AvailabilityService,
};

/// List bookable slots for a company
/// GET /api/v1/booking/:company_id/availability
#[utoipa::path(
    get,
    path = "/v1/booking/{company_id}/availability",
    tag = "Availability",
    operation_id = "getAvailability",
    params(
        ("company_id" = Uuid, Path, description = "Company (tenant) ID"),
        AvailabilityParams
    ),
    responses(
        (status = 200, description = "Ordered list of bookable slots", body = AvailabilityResponse),
        (status = 400, description = "Bad request - validation failed"),
        (status = 422, description = "Calendar not configured for this company")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
) -> impl IntoResponse {
    let availability_service = AvailabilityService::new(&state);

    match availability_service
        .list_slots(company_id, &params, Utc::now())
        .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}
