// External calendar busy aggregation
// Fail-open by design: a provider outage degrades to "no busy data from that
// provider" and flips a warning flag; it never fails slot generation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app_config::CONFIG;
use crate::db::DieselPool;
use crate::models::{CalendarIntegration, CalendarProvider};
use crate::services::conflict::BusyInterval;

// Shared HTTP client for provider calls; slot generation must never hang on
// a slow integration, so the timeout is tight.
static PROVIDER_HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .pool_max_idle_per_host(10)
        .timeout(std::time::Duration::from_secs(5))
        .user_agent("Slotly-Calendar-Sync/1.0")
        .build()
        .expect("Failed to create HTTP client for calendar providers")
});

/// Refresh an access token this close to its expiry.
const TOKEN_REFRESH_LEEWAY_SECS: i64 = 60;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    #[error("Database error: {0}")]
    Database(String),
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BusyProvider: Send + Sync {
    /// Fetch busy intervals over a UTC range using a valid access token.
    async fn fetch_busy(
        &self,
        client: &Client,
        access_token: &str,
        external_calendar_id: Option<&str>,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ProviderError>;

    /// Exchange a refresh token at the provider's standard token endpoint.
    async fn refresh_token(
        &self,
        client: &Client,
        refresh_token: &str,
    ) -> Result<RefreshedToken, ProviderError>;
}

fn provider_impl(provider: CalendarProvider) -> Box<dyn BusyProvider> {
    match provider {
        CalendarProvider::Google => Box::new(GoogleCalendarProvider),
        CalendarProvider::Outlook => Box::new(OutlookCalendarProvider),
    }
}

// =============================================================================
// GOOGLE
// =============================================================================

pub struct GoogleCalendarProvider;

/// Parse the `calendars.*.busy` blocks of a freeBusy response.
pub fn parse_google_busy(payload: &serde_json::Value) -> Result<Vec<BusyInterval>, ProviderError> {
    let calendars = payload
        .get("calendars")
        .and_then(|c| c.as_object())
        .ok_or_else(|| ProviderError::UnexpectedPayload("missing calendars".to_string()))?;

    let mut intervals = Vec::new();
    for calendar in calendars.values() {
        let Some(busy) = calendar.get("busy").and_then(|b| b.as_array()) else {
            continue;
        };
        for block in busy {
            let (Some(start), Some(end)) = (
                block.get("start").and_then(|v| v.as_str()),
                block.get("end").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            let start = DateTime::parse_from_rfc3339(start)
                .map_err(|e| ProviderError::UnexpectedPayload(e.to_string()))?;
            let end = DateTime::parse_from_rfc3339(end)
                .map_err(|e| ProviderError::UnexpectedPayload(e.to_string()))?;
            intervals.push(BusyInterval::new(
                start.with_timezone(&Utc),
                end.with_timezone(&Utc),
            ));
        }
    }
    Ok(intervals)
}

#[async_trait]
impl BusyProvider for GoogleCalendarProvider {
    async fn fetch_busy(
        &self,
        client: &Client,
        access_token: &str,
        external_calendar_id: Option<&str>,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        let calendar_id = external_calendar_id.unwrap_or("primary");
        let body = serde_json::json!({
            "timeMin": range_start.to_rfc3339(),
            "timeMax": range_end.to_rfc3339(),
            "items": [{"id": calendar_id}],
        });

        let response = client
            .post("https://www.googleapis.com/calendar/v3/freeBusy")
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: serde_json::Value = response.json().await?;
        parse_google_busy(&payload)
    }

    async fn refresh_token(
        &self,
        client: &Client,
        refresh_token: &str,
    ) -> Result<RefreshedToken, ProviderError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", CONFIG.integrations.google_client_id.as_str()),
            (
                "client_secret",
                CONFIG.integrations.google_client_secret.as_str(),
            ),
        ];

        let response = client
            .post("https://oauth2.googleapis.com/token")
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::TokenRefresh(format!(
                "google token endpoint returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        parse_token_response(&payload)
    }
}

// =============================================================================
// OUTLOOK
// =============================================================================

pub struct OutlookCalendarProvider;

/// Parse a Graph calendarView page; events marked `free` do not block.
pub fn parse_outlook_busy(payload: &serde_json::Value) -> Result<Vec<BusyInterval>, ProviderError> {
    let events = payload
        .get("value")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::UnexpectedPayload("missing value array".to_string()))?;

    let mut intervals = Vec::new();
    for event in events {
        if event.get("showAs").and_then(|v| v.as_str()) == Some("free") {
            continue;
        }
        let start = graph_datetime(event.get("start"))?;
        let end = graph_datetime(event.get("end"))?;
        intervals.push(BusyInterval::new(start, end));
    }
    Ok(intervals)
}

fn graph_datetime(value: Option<&serde_json::Value>) -> Result<DateTime<Utc>, ProviderError> {
    // Graph returns {"dateTime": "2025-01-06T09:00:00.0000000", "timeZone": "UTC"}
    let raw = value
        .and_then(|v| v.get("dateTime"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::UnexpectedPayload("missing dateTime".to_string()))?;

    let naive = chrono::NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| ProviderError::UnexpectedPayload(e.to_string()))?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[async_trait]
impl BusyProvider for OutlookCalendarProvider {
    async fn fetch_busy(
        &self,
        client: &Client,
        access_token: &str,
        external_calendar_id: Option<&str>,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ProviderError> {
        let base = match external_calendar_id {
            Some(id) => format!("https://graph.microsoft.com/v1.0/me/calendars/{}/calendarView", id),
            None => "https://graph.microsoft.com/v1.0/me/calendar/calendarView".to_string(),
        };

        let response = client
            .get(&base)
            .query(&[
                ("startDateTime", range_start.to_rfc3339()),
                ("endDateTime", range_end.to_rfc3339()),
                ("$select", "start,end,showAs".to_string()),
                ("$top", "250".to_string()),
            ])
            .bearer_auth(access_token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .send()
            .await?
            .error_for_status()?;

        let payload: serde_json::Value = response.json().await?;
        parse_outlook_busy(&payload)
    }

    async fn refresh_token(
        &self,
        client: &Client,
        refresh_token: &str,
    ) -> Result<RefreshedToken, ProviderError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", CONFIG.integrations.outlook_client_id.as_str()),
            (
                "client_secret",
                CONFIG.integrations.outlook_client_secret.as_str(),
            ),
            ("scope", "https://graph.microsoft.com/Calendars.Read offline_access"),
        ];

        let response = client
            .post("https://login.microsoftonline.com/common/oauth2/v2.0/token")
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::TokenRefresh(format!(
                "outlook token endpoint returned {}",
                response.status()
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        parse_token_response(&payload)
    }
}

/// Shared token-endpoint response shape: `access_token` + `expires_in`.
fn parse_token_response(payload: &serde_json::Value) -> Result<RefreshedToken, ProviderError> {
    let access_token = payload
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::TokenRefresh("response carried no access_token".to_string()))?
        .to_string();

    let expires_at = payload
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .map(|secs| Utc::now() + Duration::seconds(secs));

    Ok(RefreshedToken {
        access_token,
        expires_at,
    })
}

// =============================================================================
// AGGREGATOR
// =============================================================================

/// Aggregate busy result; `degraded` is the caller-facing warning flag.
#[derive(Debug, Clone, Default)]
pub struct ExternalBusyResult {
    pub intervals: Vec<BusyInterval>,
    pub degraded: bool,
}

pub struct ExternalBusyAggregator {
    diesel_pool: DieselPool,
}

impl ExternalBusyAggregator {
    pub fn new(diesel_pool: DieselPool) -> Self {
        Self { diesel_pool }
    }

    /// Collect busy intervals from every connected, supported integration.
    /// Never fails: provider or database errors degrade to an empty
    /// contribution with the warning flag set.
    pub async fn collect_busy(
        &self,
        company_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ExternalBusyResult {
        let integrations = match self.load_connected(company_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to load calendar integrations for {}: {}", company_id, e);
                return ExternalBusyResult {
                    intervals: Vec::new(),
                    degraded: true,
                };
            },
        };

        let fetches = integrations.into_iter().filter_map(|integration| {
            // Unknown provider types are skipped, not degraded
            let provider = match integration.provider() {
                Ok(p) => p,
                Err(reason) => {
                    info!("Skipping integration {}: {}", integration.id, reason);
                    return None;
                },
            };
            let pool = self.diesel_pool.clone();
            Some(async move {
                fetch_one(pool, provider, integration, range_start, range_end, now).await
            })
        });

        let mut result = ExternalBusyResult::default();
        for outcome in join_all(fetches).await {
            match outcome {
                Ok(mut intervals) => result.intervals.append(&mut intervals),
                Err(_) => result.degraded = true,
            }
        }
        result
    }

    async fn load_connected(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<CalendarIntegration>, ProviderError> {
        use crate::schema::calendar_integrations::dsl;

        let mut conn = self
            .diesel_pool
            .get()
            .await
            .map_err(|e| ProviderError::Database(e.to_string()))?;

        dsl::calendar_integrations
            .filter(dsl::company_id.eq(company_id))
            .filter(dsl::status.eq("connected"))
            .load(&mut conn)
            .await
            .map_err(|e| ProviderError::Database(e.to_string()))
    }
}

/// One provider-scoped fetch: refresh-and-persist the token when it is about
/// to expire, then pull busy intervals. Failures here are contained by the
/// aggregator.
async fn fetch_one(
    pool: DieselPool,
    provider: CalendarProvider,
    integration: CalendarIntegration,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<BusyInterval>, ProviderError> {
    let implementation = provider_impl(provider);
    let client = &*PROVIDER_HTTP_CLIENT;

    let access_token = if integration.token_needs_refresh(now) {
        let refresh_token = integration.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::TokenRefresh("token expired and no refresh token stored".to_string())
        })?;

        let refreshed = implementation.refresh_token(client, refresh_token).await?;

        // Persist before use so a crash between refresh and fetch does not
        // strand a revoked token in the row.
        persist_refreshed_token(&pool, integration.id, &refreshed).await?;
        info!(
            "Refreshed {} token for integration {}",
            provider.as_str(),
            integration.id
        );
        refreshed.access_token
    } else {
        integration.access_token.clone()
    };

    let intervals = implementation
        .fetch_busy(
            client,
            &access_token,
            integration.external_calendar_id.as_deref(),
            range_start,
            range_end,
        )
        .await
        .map_err(|e| {
            warn!(
                "Busy fetch failed for {} integration {}: {}",
                provider.as_str(),
                integration.id,
                e
            );
            e
        })?;

    Ok(intervals)
}

async fn persist_refreshed_token(
    pool: &DieselPool,
    integration_id: Uuid,
    refreshed: &RefreshedToken,
) -> Result<(), ProviderError> {
    use crate::schema::calendar_integrations::dsl;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| ProviderError::Database(e.to_string()))?;

    diesel::update(dsl::calendar_integrations.find(integration_id))
        .set((
            dsl::access_token.eq(refreshed.access_token.clone()),
            dsl::token_expires_at.eq(refreshed.expires_at),
            dsl::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await
        .map_err(|e| ProviderError::Database(e.to_string()))?;

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_google_busy() {
        let payload = serde_json::json!({
            "kind": "calendar#freeBusy",
            "calendars": {
                "primary": {
                    "busy": [
                        {"start": "2025-01-06T09:00:00Z", "end": "2025-01-06T09:30:00Z"},
                        {"start": "2025-01-06T13:00:00+01:00", "end": "2025-01-06T14:00:00+01:00"}
                    ]
                }
            }
        });

        let intervals = parse_google_busy(&payload).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(
            intervals[0].start,
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
        );
        // Offset form normalizes to UTC
        assert_eq!(
            intervals[1].start,
            Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_google_busy_rejects_malformed_payload() {
        assert!(parse_google_busy(&serde_json::json!({"error": "backend"})).is_err());
    }

    #[test]
    fn test_parse_outlook_busy_skips_free_events() {
        let payload = serde_json::json!({
            "value": [
                {
                    "showAs": "busy",
                    "start": {"dateTime": "2025-01-06T09:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2025-01-06T10:00:00.0000000", "timeZone": "UTC"}
                },
                {
                    "showAs": "free",
                    "start": {"dateTime": "2025-01-06T11:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2025-01-06T12:00:00.0000000", "timeZone": "UTC"}
                }
            ]
        });

        let intervals = parse_outlook_busy(&payload).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(
            intervals[0].end,
            Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_token_response() {
        let refreshed = parse_token_response(&serde_json::json!({
            "access_token": "ya29.new",
            "expires_in": 3600,
            "token_type": "Bearer"
        }))
        .unwrap();

        assert_eq!(refreshed.access_token, "ya29.new");
        assert!(refreshed.expires_at.is_some());

        assert!(parse_token_response(&serde_json::json!({"token_type": "Bearer"})).is_err());
    }
}
