// Lead identity resolution
// A booking always ends up linked to exactly one lead. Resolution priority:
// existing conversation link, then email match, then phone match, then a
// newly created record.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::info;
use uuid::Uuid;

use crate::models::{CompanyLead, LeadIdentity, NewCompanyLead};
use crate::utils::booking_errors::BookingError;
use crate::utils::normalize_phone;

/// Resolve or create the lead for a booking.
pub async fn find_or_create_lead(
    conn: &mut AsyncPgConnection,
    company_id: Uuid,
    identity: &LeadIdentity,
    now: DateTime<Utc>,
) -> Result<CompanyLead, BookingError> {
    use crate::schema::company_leads::dsl;

    let email = identity
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let phone = identity
        .phone
        .as_deref()
        .map(normalize_phone)
        .filter(|p| !p.is_empty());

    if let Some(conversation_id) = identity.conversation_id {
        let found: Option<CompanyLead> = dsl::company_leads
            .filter(dsl::company_id.eq(company_id))
            .filter(dsl::conversation_id.eq(conversation_id))
            .first(conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if let Some(lead) = found {
            return Ok(lead);
        }
    }

    if let Some(ref email) = email {
        let found: Option<CompanyLead> = dsl::company_leads
            .filter(dsl::company_id.eq(company_id))
            .filter(dsl::email.eq(email))
            .first(conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if let Some(lead) = found {
            return backfill_conversation(conn, lead, identity.conversation_id, now).await;
        }
    }

    if let Some(ref phone) = phone {
        let found: Option<CompanyLead> = dsl::company_leads
            .filter(dsl::company_id.eq(company_id))
            .filter(dsl::phone.eq(phone))
            .first(conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if let Some(lead) = found {
            return backfill_conversation(conn, lead, identity.conversation_id, now).await;
        }
    }

    let new_lead = NewCompanyLead {
        id: Uuid::new_v4(),
        company_id,
        name: identity.name.clone(),
        email,
        phone,
        source: identity.source.clone(),
        conversation_id: identity.conversation_id,
        created_at: now,
        updated_at: now,
    };

    let lead: CompanyLead = diesel::insert_into(dsl::company_leads)
        .values(&new_lead)
        .get_result(conn)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

    info!("Created lead {} for company {}", lead.id, company_id);
    Ok(lead)
}

/// A lead matched by contact details gains the conversation link when the
/// request carries one the row lacks.
async fn backfill_conversation(
    conn: &mut AsyncPgConnection,
    lead: CompanyLead,
    conversation_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<CompanyLead, BookingError> {
    use crate::schema::company_leads::dsl;

    let Some(conversation_id) = conversation_id else {
        return Ok(lead);
    };
    if lead.conversation_id.is_some() {
        return Ok(lead);
    }

    diesel::update(dsl::company_leads.find(lead.id))
        .set((
            dsl::conversation_id.eq(Some(conversation_id)),
            dsl::updated_at.eq(now),
        ))
        .get_result(conn)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))
}
