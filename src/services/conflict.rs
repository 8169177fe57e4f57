// Conflict checking: the single overlap predicate and the busy-interval
// loaders shared by slot generation, hold creation, booking and reschedule

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::models::{AppointmentStatus, CalendarSettings};
use crate::utils::booking_errors::BookingError;

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`
/// overlap iff `a_start < b_end && b_start < a_end`. Touching intervals do
/// not overlap. Every overlap test in the engine goes through this function.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// An interval during which no new appointment may start or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Expand by the tenant's buffers; appointments and holds block buffer
    /// time around them, external busy blocks do not.
    pub fn expanded(&self, buffer_before_minutes: i32, buffer_after_minutes: i32) -> Self {
        Self {
            start: self.start - Duration::minutes(buffer_before_minutes as i64),
            end: self.end + Duration::minutes(buffer_after_minutes as i64),
        }
    }

    pub fn blocks(&self, candidate_start: DateTime<Utc>, candidate_end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, candidate_start, candidate_end)
    }
}

/// Busy intervals from non-cancelled appointments overlapping the query
/// range, buffer-expanded per the tenant settings. `exclude` drops one
/// appointment (the one a reschedule is replacing).
pub async fn load_appointment_busy(
    conn: &mut AsyncPgConnection,
    settings: &CalendarSettings,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<Vec<BusyInterval>, BookingError> {
    use crate::schema::appointments::dsl;

    // Widen the scan so rows whose buffer expansion reaches into the range
    // are picked up.
    let scan_start = range_start - Duration::minutes(settings.buffer_after_minutes as i64);
    let scan_end = range_end + Duration::minutes(settings.buffer_before_minutes as i64);

    let mut query = dsl::appointments
        .filter(dsl::company_id.eq(settings.company_id))
        .filter(dsl::status.eq_any(vec![
            AppointmentStatus::Confirmed.as_str(),
            AppointmentStatus::Pending.as_str(),
        ]))
        .filter(dsl::start_at.lt(scan_end))
        .filter(dsl::end_at.gt(scan_start))
        .select((dsl::start_at, dsl::end_at))
        .into_boxed();

    if let Some(excluded_id) = exclude {
        query = query.filter(dsl::id.ne(excluded_id));
    }

    let rows: Vec<(DateTime<Utc>, DateTime<Utc>)> = query
        .load(conn)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|(start, end)| {
            BusyInterval::new(start, end)
                .expanded(settings.buffer_before_minutes, settings.buffer_after_minutes)
        })
        .collect())
}

/// Busy intervals from unexpired holds overlapping the query range, with the
/// same buffer expansion as appointments. `exclude_token` drops the hold
/// being consumed so a commit does not conflict with itself.
pub async fn load_hold_busy(
    conn: &mut AsyncPgConnection,
    settings: &CalendarSettings,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    now: DateTime<Utc>,
    exclude_token: Option<&str>,
) -> Result<Vec<BusyInterval>, BookingError> {
    use crate::schema::booking_holds::dsl;

    let scan_start = range_start - Duration::minutes(settings.buffer_after_minutes as i64);
    let scan_end = range_end + Duration::minutes(settings.buffer_before_minutes as i64);

    let mut query = dsl::booking_holds
        .filter(dsl::company_id.eq(settings.company_id))
        .filter(dsl::expires_at.gt(now))
        .filter(dsl::start_at.lt(scan_end))
        .filter(dsl::end_at.gt(scan_start))
        .select((dsl::start_at, dsl::end_at))
        .into_boxed();

    if let Some(token) = exclude_token {
        query = query.filter(dsl::token.ne(token.to_string()));
    }

    let rows: Vec<(DateTime<Utc>, DateTime<Utc>)> = query
        .load(conn)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

    Ok(rows
        .into_iter()
        .map(|(start, end)| {
            BusyInterval::new(start, end)
                .expanded(settings.buffer_before_minutes, settings.buffer_after_minutes)
        })
        .collect())
}

/// The shared final check for holds, booking and reschedule: appointments
/// win ties over holds, so `slot_taken` is reported before `slot_held`.
pub async fn ensure_interval_free(
    conn: &mut AsyncPgConnection,
    settings: &CalendarSettings,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    now: DateTime<Utc>,
    exclude_appointment: Option<Uuid>,
    exclude_hold_token: Option<&str>,
) -> Result<(), BookingError> {
    let appointments =
        load_appointment_busy(conn, settings, start_at, end_at, exclude_appointment).await?;
    if appointments.iter().any(|b| b.blocks(start_at, end_at)) {
        return Err(BookingError::SlotTaken);
    }

    let holds =
        load_hold_busy(conn, settings, start_at, end_at, now, exclude_hold_token).await?;
    if holds.iter().any(|b| b.blocks(start_at, end_at)) {
        return Err(BookingError::SlotHeld);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_overlap_predicate() {
        // Plain overlap
        assert!(overlaps(at(9, 0), at(10, 0), at(9, 30), at(10, 30)));
        // Containment
        assert!(overlaps(at(9, 0), at(12, 0), at(10, 0), at(10, 30)));
        // Disjoint
        assert!(!overlaps(at(9, 0), at(10, 0), at(11, 0), at(12, 0)));
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        assert!(!overlaps(at(9, 0), at(10, 0), at(10, 0), at(11, 0)));
        assert!(!overlaps(at(10, 0), at(11, 0), at(9, 0), at(10, 0)));
    }

    #[test]
    fn test_buffer_expansion_blocks_adjacent_candidate() {
        let appointment = BusyInterval::new(at(10, 0), at(10, 30));

        // Without buffers a back-to-back candidate is fine
        assert!(!appointment.blocks(at(10, 30), at(11, 0)));

        // A 15-minute after-buffer makes the same candidate conflict
        let expanded = appointment.expanded(0, 15);
        assert!(expanded.blocks(at(10, 30), at(11, 0)));
        assert!(!expanded.blocks(at(10, 45), at(11, 15)));

        // Before-buffer blocks a candidate ending right at the start
        let expanded = appointment.expanded(15, 0);
        assert!(expanded.blocks(at(9, 30), at(10, 0)));
    }
}
