// Billing read model: the entitlement source for hold/book gating

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::company_billing;

/// Read-only billing snapshot for a tenant. Written by the billing surface;
/// this engine only ever reads it to derive entitlement.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = company_billing)]
#[diesel(primary_key(company_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyBilling {
    pub company_id: Uuid,
    pub status: String,
    pub plan_key: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyBilling {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn is_trialing(&self) -> bool {
        self.status == "trialing"
    }
}
