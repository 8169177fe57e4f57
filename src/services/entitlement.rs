// Entitlement gating for hold/book operations
// Derived, never stored: a function of billing status and plan capabilities,
// evaluated per request. Public booking page and authenticated admin actions
// share this one evaluation.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::CompanyBilling;
use crate::utils::booking_errors::BookingError;

// =============================================================================
// PLAN CAPABILITIES
// =============================================================================

/// Capability set resolved from a plan key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanCapabilities {
    /// Plan key (free, starter, growth, scale)
    pub key: String,

    /// Display name for the plan
    pub display_name: String,

    /// Whether the plan may take bookings at all
    pub can_take_bookings: bool,

    /// Whether external calendar busy feeds are consulted
    pub has_calendar_integrations: bool,

    /// Maximum connected external calendars
    pub max_calendar_integrations: u32,
}

impl PlanCapabilities {
    pub fn free() -> Self {
        Self {
            key: "free".to_string(),
            display_name: "Free".to_string(),
            can_take_bookings: false,
            has_calendar_integrations: false,
            max_calendar_integrations: 0,
        }
    }

    pub fn starter() -> Self {
        Self {
            key: "starter".to_string(),
            display_name: "Starter".to_string(),
            can_take_bookings: true,
            has_calendar_integrations: false,
            max_calendar_integrations: 0,
        }
    }

    pub fn growth() -> Self {
        Self {
            key: "growth".to_string(),
            display_name: "Growth".to_string(),
            can_take_bookings: true,
            has_calendar_integrations: true,
            max_calendar_integrations: 2,
        }
    }

    pub fn scale() -> Self {
        Self {
            key: "scale".to_string(),
            display_name: "Scale".to_string(),
            can_take_bookings: true,
            has_calendar_integrations: true,
            max_calendar_integrations: 10,
        }
    }

    /// Resolve a stored plan key; unknown keys degrade to the free plan.
    pub fn for_plan(plan_key: &str) -> Self {
        match plan_key {
            "starter" => Self::starter(),
            "growth" => Self::growth(),
            "scale" => Self::scale(),
            _ => Self::free(),
        }
    }
}

// =============================================================================
// ENTITLEMENT GATE
// =============================================================================

pub struct EntitlementGate;

impl EntitlementGate {
    /// Evaluate the hold/book capability from a billing snapshot.
    ///
    /// Allowed iff status is `active`, or `trialing` with the period end in
    /// the future, and the resolved plan grants bookings. Everything else is
    /// a structured `booking_locked`.
    pub fn evaluate(
        billing: Option<&CompanyBilling>,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let Some(billing) = billing else {
            return Err(BookingError::BookingLocked {
                reason: "No active subscription".to_string(),
                trial_ends_at: None,
            });
        };

        if billing.is_trialing() {
            match billing.current_period_end {
                Some(period_end) if period_end > now => {},
                period_end => {
                    return Err(BookingError::BookingLocked {
                        reason: "Trial period has ended".to_string(),
                        trial_ends_at: period_end,
                    });
                },
            }
        } else if !billing.is_active() {
            return Err(BookingError::BookingLocked {
                reason: format!("Subscription is {}", billing.status),
                trial_ends_at: None,
            });
        }

        let plan = PlanCapabilities::for_plan(&billing.plan_key);
        if !plan.can_take_bookings {
            return Err(BookingError::BookingLocked {
                reason: format!("The {} plan does not include bookings", plan.display_name),
                trial_ends_at: billing.current_period_end.filter(|_| billing.is_trialing()),
            });
        }

        Ok(())
    }

    /// Load the tenant's billing snapshot and evaluate. One code path for
    /// `can_hold` and `can_book`.
    pub async fn ensure_can_book(
        conn: &mut AsyncPgConnection,
        company_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        use crate::schema::company_billing::dsl;

        let billing: Option<CompanyBilling> = dsl::company_billing
            .find(company_id)
            .first(conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Self::evaluate(billing.as_ref(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn billing(status: &str, plan_key: &str, period_end: Option<DateTime<Utc>>) -> CompanyBilling {
        CompanyBilling {
            company_id: Uuid::new_v4(),
            status: status.to_string(),
            plan_key: plan_key.to_string(),
            current_period_end: period_end,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_plan_with_bookings_allowed() {
        let now = Utc::now();
        let row = billing("active", "starter", None);
        assert!(EntitlementGate::evaluate(Some(&row), now).is_ok());
    }

    #[test]
    fn test_trialing_within_period_allowed() {
        let now = Utc::now();
        let row = billing("trialing", "growth", Some(now + Duration::days(7)));
        assert!(EntitlementGate::evaluate(Some(&row), now).is_ok());
    }

    #[test]
    fn test_expired_trial_locks_with_trial_end() {
        let now = Utc::now();
        let ended = now - Duration::days(2);
        let row = billing("trialing", "growth", Some(ended));

        let error = EntitlementGate::evaluate(Some(&row), now).unwrap_err();
        match error {
            BookingError::BookingLocked { trial_ends_at, .. } => {
                assert_eq!(trial_ends_at, Some(ended));
            },
            other => panic!("expected BookingLocked, got {:?}", other),
        }
    }

    #[test]
    fn test_non_active_statuses_locked() {
        let now = Utc::now();
        for status in ["past_due", "canceled", "incomplete"] {
            let row = billing(status, "starter", None);
            assert!(matches!(
                EntitlementGate::evaluate(Some(&row), now),
                Err(BookingError::BookingLocked { .. })
            ));
        }
    }

    #[test]
    fn test_missing_billing_row_locked() {
        assert!(matches!(
            EntitlementGate::evaluate(None, Utc::now()),
            Err(BookingError::BookingLocked { .. })
        ));
    }

    #[test]
    fn test_plan_without_bookings_locked_even_when_active() {
        let now = Utc::now();
        let row = billing("active", "free", None);
        assert!(matches!(
            EntitlementGate::evaluate(Some(&row), now),
            Err(BookingError::BookingLocked { .. })
        ));
    }

    #[test]
    fn test_unknown_plan_degrades_to_free() {
        let plan = PlanCapabilities::for_plan("legacy-gold");
        assert_eq!(plan, PlanCapabilities::free());
    }
}
