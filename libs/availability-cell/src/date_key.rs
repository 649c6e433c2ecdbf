//! Canonical calendar-date keys.
//!
//! Every map keyed by date (holidays, booked slots, draft sessions) goes
//! through this module so that `2025-6-1`, `2025-06-01T00:00:00.000Z` and
//! `01-06-2025` all land on the same `NaiveDate`. The canonical textual form
//! is zero-padded `YYYY-MM-DD`.
//!
//! Timestamps that carry an offset name an instant, so they resolve to the
//! calendar date at the clinic. The clinic offset is set once at startup.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

static CLINIC_OFFSET: OnceLock<FixedOffset> = OnceLock::new();

/// Sets the clinic offset from whole minutes east of UTC. Only the first call wins.
pub fn set_clinic_offset_minutes(minutes: i32) {
    let Some(offset) = FixedOffset::east_opt(minutes.saturating_mul(60)) else {
        warn!("Clinic UTC offset of {} minutes is out of range, keeping {}", minutes, clinic_offset());
        return;
    };
    if CLINIC_OFFSET.set(offset).is_err() {
        warn!("Clinic UTC offset already set to {}", clinic_offset());
    }
}

/// The clinic offset, IST unless configured otherwise.
pub fn clinic_offset() -> FixedOffset {
    *CLINIC_OFFSET.get_or_init(|| {
        FixedOffset::east_opt(shared_config::DEFAULT_CLINIC_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix())
    })
}

pub fn canonical_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a server-side date key against the clinic offset.
///
/// Accepts `Y-M-D` (padded or not), RFC 3339 timestamps, timestamps without an
/// offset whose date part is `Y-M-D`, and `D-M-Y` when the last component is
/// the four-digit year. `/` works as a separator too. Anything else yields `None`.
pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    parse_date_key_at(raw, clinic_offset())
}

/// `parse_date_key` with an explicit clinic offset.
pub fn parse_date_key_at(raw: &str, clinic: FixedOffset) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&clinic).date_naive());
    }

    let date_part = trimmed
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    let parts: Vec<&str> = date_part.split(|c: char| c == '-' || c == '/').collect();
    let [first, second, third] = parts.as_slice() else {
        return None;
    };

    if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    let (year, month, day) = if first.len() == 4 {
        (first, second, third)
    } else if third.len() == 4 {
        (third, second, first)
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Deserializes a date that may arrive in any of the shapes `parse_date_key` accepts.
pub fn deserialize_date_key<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_key(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date key: {}", raw)))
}

/// A calendar month, the unit the booking calendar is browsed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses `YYYY-MM` (or `YYYY-M`).
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        if year.len() != 4 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let first = self.first_day();
        (0..31)
            .map(move |offset| first + Duration::days(offset))
            .take_while(move |date| self.contains(*date))
    }
}

impl std::fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn canonical_key_is_zero_padded() {
        assert_eq!(canonical_key(ymd(2025, 6, 1)), "2025-06-01");
    }

    #[test]
    fn parses_padded_and_unpadded_year_first_keys() {
        assert_eq!(parse_date_key("2025-06-10"), Some(ymd(2025, 6, 10)));
        assert_eq!(parse_date_key("2025-6-1"), Some(ymd(2025, 6, 1)));
        assert_eq!(parse_date_key("2025/06/10"), Some(ymd(2025, 6, 10)));
    }

    #[test]
    fn parses_timestamps_by_date_part() {
        assert_eq!(parse_date_key("2025-06-10T00:00:00.000Z"), Some(ymd(2025, 6, 10)));
        assert_eq!(parse_date_key("2025-06-10 18:30:00"), Some(ymd(2025, 6, 10)));
    }

    #[test]
    fn utc_timestamps_resolve_to_the_clinic_date() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let utc = Utc.fix();

        // Midnight of 10 June in IST, as a browser serializes it.
        assert_eq!(parse_date_key_at("2025-06-09T18:30:00.000Z", ist), Some(ymd(2025, 6, 10)));
        assert_eq!(parse_date_key_at("2025-06-09T18:30:00.000Z", utc), Some(ymd(2025, 6, 9)));
        assert_eq!(parse_date_key_at("2025-06-10T23:00:00+05:30", ist), Some(ymd(2025, 6, 10)));
        // No offset means the date part is already local.
        assert_eq!(parse_date_key_at("2025-06-09 23:30:00", ist), Some(ymd(2025, 6, 9)));
        assert_eq!(clinic_offset(), ist);
    }

    #[test]
    fn parses_day_first_keys() {
        assert_eq!(parse_date_key("10-06-2025"), Some(ymd(2025, 6, 10)));
        assert_eq!(parse_date_key("1-6-2025"), Some(ymd(2025, 6, 1)));
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_date_key(""), None);
        assert_eq!(parse_date_key("tomorrow"), None);
        assert_eq!(parse_date_key("2025-02-30"), None);
        assert_eq!(parse_date_key("25-06-10"), None);
        assert_eq!(parse_date_key("2025-06"), None);
    }

    #[test]
    fn month_days_cover_whole_month() {
        let june = CalendarMonth::parse("2025-06").unwrap();
        let days: Vec<NaiveDate> = june.days().collect();
        assert_eq!(days.len(), 30);
        assert_eq!(days[0], ymd(2025, 6, 1));
        assert_eq!(days[29], ymd(2025, 6, 30));

        let feb_leap = CalendarMonth::new(2024, 2).unwrap();
        assert_eq!(feb_leap.days().count(), 29);
        assert_eq!(feb_leap.to_string(), "2024-02");
    }

    #[test]
    fn month_parse_rejects_invalid() {
        assert_eq!(CalendarMonth::parse("2025-13"), None);
        assert_eq!(CalendarMonth::parse("06-2025"), None);
    }
}
