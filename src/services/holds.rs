// Hold management: time-boxed soft reservations
// The check-then-insert here is best-effort by design; the authoritative
// conflict resolution happens again at commit time, where consumption is a
// single atomic conditional delete.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app::AppState;
use crate::db::DieselPool;
use crate::models::{CreateHoldRequest, HoldResponse, NewBookingHold};
use crate::services::conflict::ensure_interval_free;
use crate::services::entitlement::EntitlementGate;
use crate::services::slots::load_settings;
use crate::utils::booking_errors::BookingError;
use crate::utils::validate_time_range;

/// Fixed reservation TTL.
pub const HOLD_TTL_MINUTES: i64 = 10;

/// Mint an opaque, unguessable hold token.
pub fn generate_hold_token() -> String {
    let mut token_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut token_bytes);
    base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(token_bytes)
}

pub struct HoldService {
    diesel_pool: DieselPool,
}

impl HoldService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Reserve an interval. Fails with `booking_locked` before any conflict
    /// check, `slot_taken` on an appointment conflict and `slot_held` on a
    /// hold conflict. Expired holds never block.
    #[instrument(skip(self, request))]
    pub async fn create_hold(
        &self,
        company_id: Uuid,
        request: &CreateHoldRequest,
        now: DateTime<Utc>,
    ) -> Result<HoldResponse, BookingError> {
        use crate::schema::booking_holds::dsl;
        use diesel_async::RunQueryDsl;

        request
            .validate_custom()
            .map_err(BookingError::ValidationError)?;
        validate_time_range(request.start_at, request.end_at)
            .map_err(BookingError::ValidationError)?;

        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        EntitlementGate::ensure_can_book(&mut conn, company_id, now).await?;

        let settings = load_settings(&mut conn, company_id).await?;
        ensure_interval_free(
            &mut conn,
            &settings,
            request.start_at,
            request.end_at,
            now,
            None,
            None,
        )
        .await?;

        let expires_at = now + Duration::minutes(HOLD_TTL_MINUTES);
        let new_hold = NewBookingHold {
            id: Uuid::new_v4(),
            company_id,
            token: generate_hold_token(),
            start_at: request.start_at,
            end_at: request.end_at,
            expires_at,
            conversation_id: request.conversation_id,
            lead_id: request.lead_id,
            meta: request.meta.clone().unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
        };

        diesel::insert_into(dsl::booking_holds)
            .values(&new_hold)
            .execute(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        info!(
            "Created hold for company {} over [{}, {})",
            company_id, new_hold.start_at, new_hold.end_at
        );

        Ok(HoldResponse {
            token: new_hold.token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_hold_token();
        // 32 bytes -> 43 chars of unpadded URL-safe base64
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_hold_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_ttl_is_ten_minutes() {
        assert_eq!(Duration::minutes(HOLD_TTL_MINUTES), Duration::minutes(10));
    }
}
