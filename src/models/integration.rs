// External calendar integration models: token-bearing rows, read and refreshed

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::calendar_integrations;

/// Supported external calendar providers. Rows with any other provider value
/// are skipped by the busy aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarProvider {
    Google,
    Outlook,
}

impl CalendarProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarProvider::Google => "google",
            CalendarProvider::Outlook => "outlook",
        }
    }
}

impl FromStr for CalendarProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(CalendarProvider::Google),
            "outlook" => Ok(CalendarProvider::Outlook),
            other => Err(format!("unsupported calendar provider: {}", other)),
        }
    }
}

/// OAuth-token-bearing integration row. Consent and token issuance happen in
/// the out-of-scope integrations surface; here tokens are only read, and
/// refreshed when within 60 seconds of expiry.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = calendar_integrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CalendarIntegration {
    pub id: Uuid,
    pub company_id: Uuid,
    pub provider: String,
    pub status: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub external_calendar_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarIntegration {
    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }

    pub fn provider(&self) -> Result<CalendarProvider, String> {
        self.provider.parse()
    }

    /// Whether the access token should be refreshed before use.
    pub fn token_needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.token_expires_at {
            Some(expires_at) => expires_at <= now + chrono::Duration::seconds(60),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn integration(expires_in: Option<i64>) -> CalendarIntegration {
        let now = Utc::now();
        CalendarIntegration {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            provider: "google".to_string(),
            status: "connected".to_string(),
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            token_expires_at: expires_in.map(|secs| now + Duration::seconds(secs)),
            external_calendar_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_refresh_window() {
        let now = Utc::now();
        // Expiring in 30s: inside the 60s refresh window
        assert!(integration(Some(30)).token_needs_refresh(now));
        // Expiring in 10 minutes: not yet
        assert!(!integration(Some(600)).token_needs_refresh(now));
        // No recorded expiry: never refreshed proactively
        assert!(!integration(None).token_needs_refresh(now));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut row = integration(None);
        row.provider = "caldav".to_string();
        assert!(row.provider().is_err());
        assert_eq!(
            "google".parse::<CalendarProvider>().unwrap(),
            CalendarProvider::Google
        );
    }
}
