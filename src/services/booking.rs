// Booking commitment: converting a valid hold into a durable appointment
// Consumption of the hold is the engine's single serialization point: one
// conditional delete whose affected-row count decides which of two racing
// commits wins.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::db::DieselPool;
use crate::models::{
    Appointment, AppointmentMeta, AppointmentResponse, AppointmentStatus, BookAppointmentRequest,
    BookingHold, LeadIdentity, NewAppointment,
};
use crate::services::conflict::ensure_interval_free;
use crate::services::entitlement::EntitlementGate;
use crate::services::leads::find_or_create_lead;
use crate::services::slots::load_settings;
use crate::utils::booking_errors::BookingError;

/// Booking origin recorded when the caller does not say otherwise
pub const DEFAULT_BOOKING_SOURCE: &str = "widget";

pub struct BookingService {
    diesel_pool: DieselPool,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Commit a hold into a confirmed appointment.
    ///
    /// Order matters: hold lookup and expiry, lead resolution, re-validation
    /// of the interval (leaving the hold intact on conflict so the caller
    /// can retry), then the atomic consume, and only after that the insert.
    #[instrument(skip(self, request))]
    pub async fn commit_hold(
        &self,
        company_id: Uuid,
        mut request: BookAppointmentRequest,
        now: DateTime<Utc>,
    ) -> Result<AppointmentResponse, BookingError> {
        use crate::schema::appointments::dsl as appointments_dsl;
        use crate::schema::booking_holds::dsl as holds_dsl;

        request.contact.sanitize();
        request.validate()?;

        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        EntitlementGate::ensure_can_book(&mut conn, company_id, now).await?;
        let settings = load_settings(&mut conn, company_id).await?;

        // (a) hold lookup and expiry
        let hold: Option<BookingHold> = holds_dsl::booking_holds
            .filter(holds_dsl::company_id.eq(company_id))
            .filter(holds_dsl::token.eq(&request.hold_token))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let hold = hold.ok_or(BookingError::HoldNotFound)?;
        if hold.is_expired(now) {
            return Err(BookingError::HoldExpired);
        }

        // (b) lead identity
        let source = request
            .source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BOOKING_SOURCE)
            .to_string();
        let conversation_id = request.conversation_id.or(hold.conversation_id);
        let identity = LeadIdentity {
            conversation_id,
            email: request.contact.email.clone(),
            phone: request.contact.phone.clone(),
            name: request.contact.name.clone(),
            source: source.clone(),
        };
        let lead = match hold.lead_id {
            Some(lead_id) => find_lead(&mut conn, company_id, lead_id).await?,
            None => None,
        };
        let lead = match lead {
            Some(lead) => lead,
            None => find_or_create_lead(&mut conn, company_id, &identity, now).await?,
        };

        // (c) re-validate against current appointments and the other holds;
        // a conflict leaves the hold intact for the caller
        ensure_interval_free(
            &mut conn,
            &settings,
            hold.start_at,
            hold.end_at,
            now,
            None,
            Some(&hold.token),
        )
        .await?;

        // (d) atomic consume: zero affected rows means another commit (or
        // expiry) won the race
        let consumed = diesel::delete(
            holds_dsl::booking_holds
                .filter(holds_dsl::token.eq(&request.hold_token))
                .filter(holds_dsl::expires_at.gt(now)),
        )
        .execute(&mut conn)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if consumed == 0 {
            return Err(BookingError::HoldAlreadyUsed);
        }

        // (e) the durable appointment, only after successful consumption
        let new_appointment = NewAppointment {
            id: Uuid::new_v4(),
            company_id,
            lead_id: lead.id,
            conversation_id,
            start_at: hold.start_at,
            end_at: hold.end_at,
            status: AppointmentStatus::Confirmed.as_str().to_string(),
            source,
            contact_name: request.contact.name.clone(),
            contact_email: request.contact.email.clone(),
            contact_phone: request.contact.phone.clone(),
            meta: AppointmentMeta::from_value(&hold.meta).to_value(),
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        let appointment: Appointment = diesel::insert_into(appointments_dsl::appointments)
            .values(&new_appointment)
            .get_result(&mut conn)
            .await
            .map_err(|e| {
                // The hold is already consumed; its TTL would have released
                // the reservation shortly anyway, so log the anomaly instead
                // of attempting a rollback.
                error!(
                    "Appointment insert failed after hold consumption for company {}: {}",
                    company_id, e
                );
                BookingError::DatabaseError(e.to_string())
            })?;

        info!(
            "Booked appointment {} for company {} over [{}, {})",
            appointment.id, company_id, appointment.start_at, appointment.end_at
        );

        Ok(appointment.to_response())
    }

    /// Cancel an appointment. The row is retired, never deleted.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        company_id: Uuid,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AppointmentResponse, BookingError> {
        use crate::schema::appointments::dsl;

        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let existing: Option<Appointment> = dsl::appointments
            .filter(dsl::company_id.eq(company_id))
            .filter(dsl::id.eq(appointment_id))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let existing = existing.ok_or(BookingError::AppointmentNotFound)?;
        if existing.is_cancelled() {
            return Err(BookingError::AlreadyCancelled);
        }

        let cancelled: Appointment = diesel::update(dsl::appointments.find(appointment_id))
            .set((
                dsl::status.eq(AppointmentStatus::Cancelled.as_str()),
                dsl::cancelled_at.eq(Some(now)),
                dsl::updated_at.eq(now),
            ))
            .get_result(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        info!(
            "Cancelled appointment {} for company {}",
            appointment_id, company_id
        );

        Ok(cancelled.to_response())
    }
}

async fn find_lead(
    conn: &mut diesel_async::AsyncPgConnection,
    company_id: Uuid,
    lead_id: Uuid,
) -> Result<Option<crate::models::CompanyLead>, BookingError> {
    use crate::schema::company_leads::dsl;

    dsl::company_leads
        .filter(dsl::company_id.eq(company_id))
        .filter(dsl::id.eq(lead_id))
        .first(conn)
        .await
        .optional()
        .map_err(|e| BookingError::DatabaseError(e.to_string()))
}
