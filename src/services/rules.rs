// Rule resolution: weekly availability rules merged with date exceptions

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::models::{AvailabilityException, AvailabilityRule};

/// A contiguous open range within a single tenant-local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Resolve the open windows for one tenant-local calendar date.
///
/// An exception for the date overrides the weekly rules entirely: closed
/// means zero windows; an open exception contributes its single custom
/// window. Without an exception, every active rule matching the local
/// weekday becomes an independent window (split shifts). Windows are ordered
/// by start time; degenerate windows (end not after start) are dropped.
pub fn windows_for_date(
    date: NaiveDate,
    rules: &[AvailabilityRule],
    exceptions: &[AvailabilityException],
) -> Vec<DayWindow> {
    if let Some(exception) = exceptions.iter().find(|e| e.date == date) {
        if exception.is_closed {
            return Vec::new();
        }
        return match (exception.start_time, exception.end_time) {
            (Some(start), Some(end)) if end > start => vec![DayWindow { start, end }],
            _ => Vec::new(),
        };
    }

    let weekday = date.weekday();
    let mut windows: Vec<DayWindow> = rules
        .iter()
        .filter(|rule| rule.applies_on(weekday))
        .filter(|rule| rule.end_time > rule.start_time)
        .map(|rule| DayWindow {
            start: rule.start_time,
            end: rule.end_time,
        })
        .collect();

    windows.sort_by_key(|w| (w.start, w.end));
    windows
}
