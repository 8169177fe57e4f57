// Common test utilities and helper structs
// Shared across integration tests; every test skips gracefully when no
// database is configured.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use slotly_backend_core::{
    app::AppState,
    app_config::AppConfig,
    db::{create_diesel_pool, DieselDatabaseConfig, DieselPool},
    migrations,
};

/// Build a pool against DATABASE_URL, running embedded migrations.
/// Returns None (after logging) when the environment has no database.
pub async fn try_pool() -> Option<DieselPool> {
    dotenv::dotenv().ok();

    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("Skipping test: DATABASE_URL not configured");
        return None;
    }

    let pool = match create_diesel_pool(DieselDatabaseConfig::default()).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: failed to create pool: {}", e);
            return None;
        },
    };

    if let Err(e) = migrations::run_all_migrations(&pool, migrations::MigrationConfig::default()).await
    {
        eprintln!("Skipping test: migration failed: {}", e);
        return None;
    }

    Some(pool)
}

/// App state wrapping a test pool.
pub fn test_state(pool: &DieselPool) -> AppState {
    AppState {
        config: std::sync::Arc::new(AppConfig::from_env().expect("config loads with defaults")),
        diesel_pool: pool.clone(),
        max_connections: 20,
    }
}

/// Seed a tenant with calendar settings and a billing row. Each test uses a
/// fresh company id, so tests isolate by tenant rather than by cleanup.
pub async fn seed_company(pool: &DieselPool, status: &str, plan_key: &str) -> Uuid {
    let company_id = Uuid::new_v4();
    let mut conn = pool.get().await.expect("pool connection");
    let now = Utc::now();

    {
        use slotly_backend_core::schema::calendar_settings::dsl;
        diesel::insert_into(dsl::calendar_settings)
            .values((
                dsl::company_id.eq(company_id),
                dsl::timezone.eq("Europe/Berlin"),
                dsl::slot_duration_minutes.eq(30),
                dsl::buffer_before_minutes.eq(0),
                dsl::buffer_after_minutes.eq(0),
                dsl::min_notice_minutes.eq(0),
                dsl::max_days_ahead.eq(14),
                dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .expect("seed calendar_settings");
    }

    {
        use slotly_backend_core::schema::company_billing::dsl;
        let period_end = match status {
            "trialing" => Some(now + Duration::days(7)),
            _ => None,
        };
        diesel::insert_into(dsl::company_billing)
            .values((
                dsl::company_id.eq(company_id),
                dsl::status.eq(status),
                dsl::plan_key.eq(plan_key),
                dsl::current_period_end.eq(period_end),
                dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .expect("seed company_billing");
    }

    company_id
}

/// Overwrite the billing row, e.g. to put a tenant into an expired trial.
pub async fn set_billing(
    pool: &DieselPool,
    company_id: Uuid,
    status: &str,
    plan_key: &str,
    current_period_end: Option<DateTime<Utc>>,
) {
    use slotly_backend_core::schema::company_billing::dsl;

    let mut conn = pool.get().await.expect("pool connection");
    diesel::update(dsl::company_billing.find(company_id))
        .set((
            dsl::status.eq(status),
            dsl::plan_key.eq(plan_key),
            dsl::current_period_end.eq(current_period_end),
            dsl::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await
        .expect("update company_billing");
}

/// Open the tenant every day of the week over one window.
pub async fn seed_all_day_rules(pool: &DieselPool, company_id: Uuid) {
    use slotly_backend_core::schema::availability_rules::dsl;

    let mut conn = pool.get().await.expect("pool connection");
    let now = Utc::now();

    for weekday in 0..7i16 {
        diesel::insert_into(dsl::availability_rules)
            .values((
                dsl::id.eq(Uuid::new_v4()),
                dsl::company_id.eq(company_id),
                dsl::weekday.eq(weekday),
                dsl::start_time.eq(chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
                dsl::end_time.eq(chrono::NaiveTime::from_hms_opt(23, 30, 0).unwrap()),
                dsl::is_active.eq(true),
                dsl::created_at.eq(now),
                dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .expect("seed availability_rules");
    }
}

/// Force a hold's expiry into the past.
pub async fn expire_hold(pool: &DieselPool, token: &str) {
    use slotly_backend_core::schema::booking_holds::dsl;

    let mut conn = pool.get().await.expect("pool connection");
    diesel::update(dsl::booking_holds.filter(dsl::token.eq(token)))
        .set(dsl::expires_at.eq(Utc::now() - Duration::minutes(1)))
        .execute(&mut conn)
        .await
        .expect("expire hold");
}

/// Count non-cancelled appointments covering an interval.
pub async fn count_active_appointments(
    pool: &DieselPool,
    company_id: Uuid,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
) -> i64 {
    use slotly_backend_core::schema::appointments::dsl;

    let mut conn = pool.get().await.expect("pool connection");
    dsl::appointments
        .filter(dsl::company_id.eq(company_id))
        .filter(dsl::start_at.eq(start_at))
        .filter(dsl::end_at.eq(end_at))
        .filter(dsl::status.ne("cancelled"))
        .count()
        .get_result(&mut conn)
        .await
        .expect("count appointments")
}

/// A fixed, minute-aligned interval a few days out.
pub fn future_interval(minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = (Utc::now() + Duration::days(3))
        .date_naive()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        .and_utc();
    (start, start + Duration::minutes(minutes))
}
