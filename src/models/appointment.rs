// Appointment models and the typed meta side-channel

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::schema::appointments;

lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9][0-9 ().\-]{1,48}$").unwrap();
}

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Pending,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "pending" => Ok(AppointmentStatus::Pending),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

// =============================================================================
// META
// =============================================================================

/// Structured appointment metadata. Known keys are typed fields; anything
/// else callers attach rides along in the opaque extension map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescheduled_from: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescheduled_to: Option<Uuid>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AppointmentMeta {
    pub fn from_value(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

// =============================================================================
// DATABASE MODELS
// =============================================================================

/// Durable appointment row. Time changes never mutate a row in place;
/// rescheduling inserts a replacement and retires the original.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Appointment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub lead_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub source: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub meta: serde_json::Value,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn status(&self) -> Result<AppointmentStatus, String> {
        self.status.parse()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled.as_str()
    }

    pub fn meta(&self) -> AppointmentMeta {
        AppointmentMeta::from_value(&self.meta)
    }

    pub fn to_response(&self) -> AppointmentResponse {
        AppointmentResponse {
            id: self.id,
            company_id: self.company_id,
            lead_id: self.lead_id,
            conversation_id: self.conversation_id,
            start_at: self.start_at,
            end_at: self.end_at,
            status: self.status.clone(),
            source: self.source.clone(),
            contact_name: self.contact_name.clone(),
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            meta: self.meta.clone(),
        }
    }
}

/// New appointment for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub lead_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub source: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub meta: serde_json::Value,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// REQUEST/RESPONSE DTOs
// =============================================================================

/// Contact details supplied at booking time
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ContactDetails {
    #[validate(length(max = 255, message = "Name must be less than 255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(regex(
        path = "PHONE_REGEX",
        message = "Phone may only contain digits, spaces, parentheses, dots, and dashes"
    ))]
    pub phone: Option<String>,
}

impl ContactDetails {
    /// Trim fields and drop the ones that end up empty.
    pub fn sanitize(&mut self) {
        self.name = crate::utils::trim_optional_field(self.name.as_ref());
        self.email = crate::utils::trim_optional_field(self.email.as_ref()).map(|e| e.to_lowercase());
        self.phone = crate::utils::trim_optional_field(self.phone.as_ref());
    }
}

/// Request to convert a hold into an appointment
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookAppointmentRequest {
    #[validate(length(min = 1, message = "Hold token is required"))]
    pub hold_token: String,

    #[validate]
    pub contact: ContactDetails,

    /// Origin of the booking (widget, booking_page, admin); defaults to widget
    pub source: Option<String>,

    pub conversation_id: Option<Uuid>,
}

/// Request to move an existing appointment to a new interval
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RescheduleRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl RescheduleRequest {
    pub fn validate_custom(&self) -> Result<(), String> {
        if self.end_at <= self.start_at {
            return Err("end_at must be after start_at".to_string());
        }
        Ok(())
    }
}

/// Appointment as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub lead_id: Uuid,
    pub conversation_id: Option<Uuid>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub source: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub meta: serde_json::Value,
}

/// Outcome of a reschedule: the retired and replacement ids, plus a warning
/// when the old record could not be retired
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RescheduleResponse {
    pub old_id: Uuid,
    pub new_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
