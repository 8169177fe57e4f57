// Tenant timezone resolution
// All scheduling rules are expressed in the tenant's IANA timezone; every
// stored or transported instant is UTC. This module is the only place the
// two meet.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use chrono_tz::Tz;

/// Civil-time view of a UTC instant in a given zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub weekday: Weekday,
}

/// Convert a tenant-local wall-clock time to a UTC instant.
///
/// DST transitions resolve deterministically: an ambiguous local time maps to
/// the earliest matching instant, and a local time that falls inside a
/// spring-forward gap advances in 5-minute steps to the first wall-clock time
/// that exists.
pub fn to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let mut local = date.and_time(time);

    loop {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(resolved) => return resolved.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => {
                // Inside a DST gap; no real zone has one longer than a day.
                local += Duration::minutes(5);
            },
        }
    }
}

/// Civil-time parts of a UTC instant in the tenant's zone.
pub fn local_parts(instant: DateTime<Utc>, tz: Tz) -> LocalParts {
    let local = instant.with_timezone(&tz);
    LocalParts {
        year: local.year(),
        month: local.month(),
        day: local.day(),
        hour: local.hour(),
        minute: local.minute(),
        weekday: local.weekday(),
    }
}

/// Tenant-local calendar date of a UTC instant.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}
