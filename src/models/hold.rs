// Booking hold models: short-lived soft reservations, not appointments

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::booking_holds;

// =============================================================================
// DATABASE MODELS
// =============================================================================

/// A time-boxed, single-use reservation of an interval. The token is opaque
/// and unguessable; expiry is lazy - other components ignore a hold whose
/// `expires_at` has passed, whether or not it is still stored.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = booking_holds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingHold {
    pub id: Uuid,
    pub company_id: Uuid,
    pub token: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub conversation_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl BookingHold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// New hold for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_holds)]
pub struct NewBookingHold {
    pub id: Uuid,
    pub company_id: Uuid,
    pub token: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub conversation_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// REQUEST/RESPONSE DTOs
// =============================================================================

/// Request to reserve a slot
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateHoldRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub conversation_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

impl CreateHoldRequest {
    /// Cross-field validation: the interval must be well-formed.
    pub fn validate_custom(&self) -> Result<(), String> {
        if self.end_at <= self.start_at {
            return Err("end_at must be after start_at".to_string());
        }
        Ok(())
    }
}

/// Reservation token handed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HoldResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_hold_expiry_is_half_open() {
        let now = Utc::now();
        let hold = BookingHold {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            token: "t".to_string(),
            start_at: now,
            end_at: now + Duration::minutes(30),
            expires_at: now,
            conversation_id: None,
            lead_id: None,
            meta: serde_json::json!({}),
            created_at: now,
        };

        // expires_at == now counts as expired
        assert!(hold.is_expired(now));
        assert!(!hold.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn test_create_hold_request_rejects_inverted_range() {
        let now = Utc::now();
        let request = CreateHoldRequest {
            start_at: now,
            end_at: now,
            conversation_id: None,
            lead_id: None,
            meta: None,
        };
        assert!(request.validate_custom().is_err());
    }
}
