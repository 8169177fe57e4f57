// Availability integration tests: generation against live holds and
// appointments. Skips when DATABASE_URL is not configured.

mod common;

use chrono::Utc;
use serial_test::serial;

use slotly_backend_core::{
    models::{AvailabilityParams, CreateHoldRequest},
    services::{AvailabilityService, HoldService},
    utils::BookingError,
};

fn params(limit: usize) -> AvailabilityParams {
    AvailabilityParams {
        duration_minutes: None,
        step_minutes: None,
        limit: Some(limit),
    }
}

#[tokio::test]
#[serial]
async fn test_availability_reflects_holds() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    let state = common::test_state(&pool);
    let company_id = common::seed_company(&pool, "active", "growth").await;
    common::seed_all_day_rules(&pool, company_id).await;

    let availability_service = AvailabilityService::new(&state);
    let before = availability_service
        .list_slots(company_id, &params(10), Utc::now())
        .await
        .expect("availability should list");

    assert!(!before.slots.is_empty());
    assert!(!before.external_busy_degraded);
    for slot in &before.slots {
        assert_eq!((slot.end_at - slot.start_at).num_minutes(), 30);
    }
    for pair in before.slots.windows(2) {
        assert!(pair[0].start_at < pair[1].start_at);
    }

    // Reserve the first offered slot
    let first = before.slots[0].clone();
    HoldService::new(&state)
        .create_hold(
            company_id,
            &CreateHoldRequest {
                start_at: first.start_at,
                end_at: first.end_at,
                conversation_id: None,
                lead_id: None,
                meta: None,
            },
            Utc::now(),
        )
        .await
        .expect("hold should be created");

    let after = availability_service
        .list_slots(company_id, &params(10), Utc::now())
        .await
        .expect("availability should list");

    assert!(
        !after
            .slots
            .iter()
            .any(|s| s.start_at == first.start_at && s.end_at == first.end_at),
        "held slot must disappear from availability"
    );
}

#[tokio::test]
#[serial]
async fn test_availability_requires_configured_calendar() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    let state = common::test_state(&pool);

    // A company that was never configured
    let error = AvailabilityService::new(&state)
        .list_slots(uuid::Uuid::new_v4(), &params(5), Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::CalendarNotConfigured));
}

#[tokio::test]
#[serial]
async fn test_availability_rejects_out_of_range_duration() {
    let Some(pool) = common::try_pool().await else {
        return;
    };
    let state = common::test_state(&pool);
    let company_id = common::seed_company(&pool, "active", "starter").await;

    let error = AvailabilityService::new(&state)
        .list_slots(
            company_id,
            &AvailabilityParams {
                duration_minutes: Some(3),
                step_minutes: None,
                limit: Some(5),
            },
            Utc::now(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, BookingError::ValidationError(_)));
}
