// Scheduling configuration models: weekly rules, date exceptions, settings

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::{availability_exceptions, availability_rules, calendar_settings};

// =============================================================================
// DATABASE MODELS
// =============================================================================

/// Recurring weekly availability rule. `weekday` is 0-6 with 0 = Sunday and is
/// evaluated against the tenant's local calendar, never UTC. A weekday may
/// carry several rules (split shifts).
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = availability_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub company_id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityRule {
    /// Whether this rule applies on the given tenant-local weekday.
    pub fn applies_on(&self, weekday: Weekday) -> bool {
        self.is_active && self.weekday == weekday.num_days_from_sunday() as i16
    }
}

/// Date-specific override. When a row exists for a tenant-local date it fully
/// replaces that date's weekly rules: closed, or a single custom window.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = availability_exceptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AvailabilityException {
    pub id: Uuid,
    pub company_id: Uuid,
    pub date: NaiveDate,
    pub is_closed: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-tenant scheduling parameters.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = calendar_settings)]
#[diesel(primary_key(company_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CalendarSettings {
    pub company_id: Uuid,
    pub timezone: String,
    pub slot_duration_minutes: i32,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
    pub min_notice_minutes: i32,
    pub max_days_ahead: i32,
    pub updated_at: DateTime<Utc>,
}

impl CalendarSettings {
    /// Resolve the stored IANA identifier. Settings are written by the admin
    /// surface; a row carrying an unknown zone is a tenant configuration
    /// error, not a process-level one.
    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("unknown IANA timezone: {}", self.timezone))
    }

    /// Validate the stored bounds: duration 5-480min, buffers 0-240min,
    /// notice 0-30 days, horizon 1-365 days.
    pub fn validate_bounds(&self) -> Result<(), String> {
        if !(5..=480).contains(&self.slot_duration_minutes) {
            return Err(format!(
                "slot_duration_minutes out of range: {}",
                self.slot_duration_minutes
            ));
        }
        if !(0..=240).contains(&self.buffer_before_minutes) {
            return Err(format!(
                "buffer_before_minutes out of range: {}",
                self.buffer_before_minutes
            ));
        }
        if !(0..=240).contains(&self.buffer_after_minutes) {
            return Err(format!(
                "buffer_after_minutes out of range: {}",
                self.buffer_after_minutes
            ));
        }
        if !(0..=43_200).contains(&self.min_notice_minutes) {
            return Err(format!(
                "min_notice_minutes out of range: {}",
                self.min_notice_minutes
            ));
        }
        if !(1..=365).contains(&self.max_days_ahead) {
            return Err(format!("max_days_ahead out of range: {}", self.max_days_ahead));
        }
        Ok(())
    }
}

// =============================================================================
// REQUEST/RESPONSE DTOs
// =============================================================================

/// Query parameters for the availability endpoint
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct AvailabilityParams {
    /// Slot length override; defaults to the tenant's configured duration
    pub duration_minutes: Option<i32>,
    /// Candidate step granularity; defaults to the configured duration
    pub step_minutes: Option<i32>,
    /// Maximum number of slots returned
    pub limit: Option<usize>,
}

/// A bookable slot as returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlotDto {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Availability listing, with the fail-open degradation flag for external
/// calendar sources
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub slots: Vec<SlotDto>,
    pub external_busy_degraded: bool,
}
