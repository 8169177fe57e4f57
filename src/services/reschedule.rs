// Rescheduling: book the new time, retire the old record
// Never mutates an appointment's times in place. The replacement row is
// inserted first; if retiring the original then fails, the operation still
// reports success with an explicit warning - a confirmed booking is never
// rolled back.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::db::DieselPool;
use crate::models::{
    Appointment, AppointmentStatus, NewAppointment, RescheduleRequest, RescheduleResponse,
};
use crate::services::conflict::ensure_interval_free;
use crate::services::entitlement::EntitlementGate;
use crate::services::slots::load_settings;
use crate::utils::booking_errors::BookingError;
use crate::utils::validate_time_range;

pub struct RescheduleService {
    diesel_pool: DieselPool,
}

impl RescheduleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            diesel_pool: state.diesel_pool.clone(),
        }
    }

    /// Move an appointment to a new interval.
    #[instrument(skip(self, request))]
    pub async fn reschedule(
        &self,
        company_id: Uuid,
        appointment_id: Uuid,
        request: &RescheduleRequest,
        now: DateTime<Utc>,
    ) -> Result<RescheduleResponse, BookingError> {
        use crate::schema::appointments::dsl;

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

        // Same final check as a commit, with the replaced appointment
        // excluded from its own conflict set
        ensure_interval_free(
            &mut conn,
            &settings,
            request.start_at,
            request.end_at,
            now,
            Some(existing.id),
            None,
        )
        .await?;

        let mut new_meta = existing.meta();
        new_meta.rescheduled_from = Some(existing.id);
        new_meta.rescheduled_to = None;

        let replacement = NewAppointment {
            id: Uuid::new_v4(),
            company_id,
            lead_id: existing.lead_id,
            conversation_id: existing.conversation_id,
            start_at: request.start_at,
            end_at: request.end_at,
            status: AppointmentStatus::Confirmed.as_str().to_string(),
            source: existing.source.clone(),
            contact_name: existing.contact_name.clone(),
            contact_email: existing.contact_email.clone(),
            contact_phone: existing.contact_phone.clone(),
            meta: new_meta.to_value(),
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        let new_appointment: Appointment = diesel::insert_into(dsl::appointments)
            .values(&replacement)
            .get_result(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        // Retire the original. The replacement is already real, so failure
        // here downgrades to a warning on the success payload.
        let mut old_meta = existing.meta();
        old_meta.rescheduled_to = Some(new_appointment.id);

        let warning = match diesel::update(dsl::appointments.find(existing.id))
            .set((
                dsl::status.eq(AppointmentStatus::Cancelled.as_str()),
                dsl::cancelled_at.eq(Some(now)),
                dsl::meta.eq(old_meta.to_value()),
                dsl::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
        {
            Ok(_) => None,
            Err(e) => {
                warn!(
                    "Reschedule of {} created {} but failed to cancel the original: {}",
                    existing.id, new_appointment.id, e
                );
                Some(format!(
                    "new appointment created, but the original could not be cancelled: {}",
                    e
                ))
            },
        };

        info!(
            "Rescheduled appointment {} -> {} for company {}",
            existing.id, new_appointment.id, company_id
        );

        Ok(RescheduleResponse {
            old_id: existing.id,
            new_id: new_appointment.id,
            warning,
        })
    }
}
