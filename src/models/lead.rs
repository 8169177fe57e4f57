// Company lead models: the identity a booking always resolves to

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::company_leads;

/// Identity-resolved contact record
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = company_leads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CompanyLead {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub conversation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New lead for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = company_leads)]
pub struct NewCompanyLead {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub conversation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs for find-or-create identity resolution. Matching priority:
/// conversation link, then email, then phone; otherwise a new row.
#[derive(Debug, Clone, Default)]
pub struct LeadIdentity {
    pub conversation_id: Option<Uuid>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub source: String,
}
