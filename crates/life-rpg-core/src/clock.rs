//! Time source and calendar helpers.
//!
//! Every calendar-day decision (streaks, caches, challenge periods) is made in
//! local time. Ledger timestamps are stored as UTC instants and converted back
//! with [`local_day`].

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};

/// Source of "now" for the engine.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Settable clock. Clones share the same instant, so a test can keep a handle
/// after moving one into the engine.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    /// Noon local time on the given date.
    pub fn at_noon(date: NaiveDate) -> Self {
        Self::new(local_noon(date))
    }

    pub fn set(&self, now: DateTime<Local>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance_days(&self, days: u64) {
        if let Ok(mut guard) = self.now.lock() {
            if let Some(next) = guard.checked_add_days(Days::new(days)) {
                *guard = next;
            }
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Noon on `date` in local time. Noon never falls in a DST gap.
pub fn local_noon(date: NaiveDate) -> DateTime<Local> {
    let naive = date.and_hms_opt(12, 0, 0).unwrap_or_default();
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}

/// Local calendar day of a stored instant.
pub fn local_day(ts: &DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Local).date_naive()
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(today)
}

/// Week start used by the completion caches (Sunday).
pub fn cache_week_start(day: NaiveDate) -> NaiveDate {
    let back = day.weekday().num_days_from_sunday() as u64;
    day.checked_sub_days(Days::new(back)).unwrap_or(day)
}

/// Week start used by the weekly XP summary (Monday).
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    let back = day.weekday().num_days_from_monday() as u64;
    day.checked_sub_days(Days::new(back)).unwrap_or(day)
}

pub fn start_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Parse a calendar date as written by any schema version: ISO
/// (`2026-10-16`), the v1 browser format (`Fri Oct 16 2026`), or a full
/// RFC 3339 instant.
pub fn parse_any_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%a %b %d %Y") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| local_day(&dt.with_timezone(&Utc)))
}

/// Parse an instant from either RFC 3339 or a bare date (taken as local noon).
pub fn parse_any_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_any_date(raw).map(|d| local_noon(d).with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_starts_differ() {
        // 2026-10-16 is a Friday
        let fri = date(2026, 10, 16);
        assert_eq!(cache_week_start(fri), date(2026, 10, 11));
        assert_eq!(start_of_week(fri), date(2026, 10, 12));

        // Sunday is the first day of a cache week but the last of a Monday week
        let sun = date(2026, 10, 18);
        assert_eq!(cache_week_start(sun), sun);
        assert_eq!(start_of_week(sun), date(2026, 10, 12));
    }

    #[test]
    fn test_parse_legacy_dates() {
        assert_eq!(parse_any_date("Fri Oct 16 2026"), Some(date(2026, 10, 16)));
        assert_eq!(parse_any_date("2026-10-16"), Some(date(2026, 10, 16)));
        assert_eq!(parse_any_date("not a date"), None);
    }

    #[test]
    fn test_fixed_clock_shared_handle() {
        let clock = FixedClock::at_noon(date(2026, 1, 31));
        let handle = clock.clone();
        handle.advance_days(1);
        assert_eq!(clock.today(), date(2026, 2, 1));
        assert_eq!(start_of_month(clock.today()), date(2026, 2, 1));
    }

    #[test]
    fn test_local_day_round_trip() {
        let clock = FixedClock::at_noon(date(2026, 3, 10));
        assert_eq!(local_day(&clock.now_utc()), date(2026, 3, 10));
    }
}
