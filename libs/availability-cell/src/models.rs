use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

use shared_backend::BackendError;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::date_key::{parse_date_key, CalendarMonth};

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// One fixed appointment interval in the slot catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub id: &'static str,
    pub label: &'static str,
    /// Limited slots draw from the smaller daily quota.
    pub limited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCategory {
    Normal,
    Limited,
}

impl TimeSlot {
    pub const fn normal(id: &'static str, label: &'static str) -> Self {
        Self { id, label, limited: false }
    }

    pub const fn limited(id: &'static str, label: &'static str) -> Self {
        Self { id, label, limited: true }
    }

    pub fn category(&self) -> SlotCategory {
        if self.limited {
            SlotCategory::Limited
        } else {
            SlotCategory::Normal
        }
    }
}

/// Per-therapist daily slot quotas before holidays and bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyQuota {
    pub normal: u32,
    pub limited: u32,
}

impl Default for DailyQuota {
    fn default() -> Self {
        Self {
            normal: 10,
            limited: 5,
        }
    }
}

impl DailyQuota {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            normal: config.daily_normal_quota,
            limited: config.daily_limited_quota,
        }
    }
}

// ==============================================================================
// THERAPIST SCHEDULE DATA (server-sourced)
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HolidayKind {
    /// Blocks every slot on the date.
    FullDay,
    /// Blocks only the named slots.
    Partial(BTreeSet<String>),
}

/// A therapist-unavailability record.
///
/// On the wire `isFullDay` may be missing; a missing flag means a full-day
/// holiday, and only an explicit `false` makes the record partial.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawHoliday")]
pub struct HolidayRecord {
    /// `None` when the server sent a date we could not parse; such records never match.
    pub date: Option<NaiveDate>,
    pub kind: HolidayKind,
}

impl HolidayRecord {
    pub fn full_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            kind: HolidayKind::FullDay,
        }
    }

    pub fn partial<I, S>(date: NaiveDate, slot_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            date: Some(date),
            kind: HolidayKind::Partial(slot_ids.into_iter().map(Into::into).collect()),
        }
    }

    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.date == Some(date)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHoliday {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    is_full_day: Option<bool>,
    #[serde(default)]
    slots: Option<Vec<SlotRef>>,
}

/// Slot references arrive either as `{ "slotId": "..." }` or as a bare id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SlotRef {
    Object {
        #[serde(rename = "slotId")]
        slot_id: String,
    },
    Id(String),
}

impl SlotRef {
    fn into_id(self) -> String {
        match self {
            SlotRef::Object { slot_id } => slot_id,
            SlotRef::Id(id) => id,
        }
    }
}

impl From<RawHoliday> for HolidayRecord {
    fn from(raw: RawHoliday) -> Self {
        let date = raw.date.as_deref().and_then(|d| {
            let parsed = parse_date_key(d);
            if parsed.is_none() {
                warn!("Ignoring holiday with unparseable date {:?}", d);
            }
            parsed
        });

        let kind = match raw.is_full_day {
            Some(false) => HolidayKind::Partial(
                raw.slots
                    .unwrap_or_default()
                    .into_iter()
                    .map(SlotRef::into_id)
                    .collect(),
            ),
            Some(true) | None => HolidayKind::FullDay,
        };

        Self { date, kind }
    }
}

/// Booked slot ids per date, keyed canonically.
pub type BookedSlots = HashMap<NaiveDate, BTreeSet<String>>;

fn deserialize_booked_slots<'de, D>(deserializer: D) -> Result<BookedSlots, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Vec<SlotRef>>> = Option::deserialize(deserializer)?;
    let mut booked = BookedSlots::new();

    for (key, slots) in raw.unwrap_or_default() {
        let Some(date) = parse_date_key(&key) else {
            warn!("Ignoring booked slots under unparseable date key {:?}", key);
            continue;
        };
        // Differently formatted keys for the same day are merged.
        booked
            .entry(date)
            .or_default()
            .extend(slots.into_iter().map(SlotRef::into_id));
    }

    Ok(booked)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Therapist {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    #[serde(default)]
    pub holidays: Vec<HolidayRecord>,
    #[serde(default, deserialize_with = "deserialize_booked_slots")]
    pub booked_slots: BookedSlots,
}

impl Therapist {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            holidays: Vec::new(),
            booked_slots: BookedSlots::new(),
        }
    }

    pub fn with_holiday(mut self, holiday: HolidayRecord) -> Self {
        self.holidays.push(holiday);
        self
    }

    pub fn with_booked<I, S>(mut self, date: NaiveDate, slot_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.booked_slots
            .entry(date)
            .or_default()
            .extend(slot_ids.into_iter().map(Into::into));
        self
    }
}

/// The slice of the bootstrap payload this cell needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TherapistRoster {
    #[serde(default)]
    pub therapists: Vec<Therapist>,
}

// ==============================================================================
// DERIVED DAY STATE AND VERDICTS
// ==============================================================================

/// Capacity of one therapist on one date, derived from quotas, holidays and bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TherapistDay {
    pub therapist_id: String,
    pub date: NaiveDate,
    pub normal_capacity: u32,
    pub limited_capacity: u32,
    pub booked_slot_ids: BTreeSet<String>,
    /// Slots excluded by partial holidays.
    pub unavailable_slot_ids: BTreeSet<String>,
    pub is_full_holiday: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotReason {
    Available,
    UnavailableSlot,
    FullDayHoliday,
    AlreadyBooked,
    NoLimitedSlots,
    NoNormalSlots,
    NoTherapistData,
    NoTherapistSelected,
}

impl SlotReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotReason::Available => "",
            SlotReason::UnavailableSlot => "Unavailable slot",
            SlotReason::FullDayHoliday => "Unavailable Slot",
            SlotReason::AlreadyBooked => "Already booked",
            SlotReason::NoLimitedSlots => "No limited slots",
            SlotReason::NoNormalSlots => "No normal slots",
            SlotReason::NoTherapistData => "No therapist data",
            SlotReason::NoTherapistSelected => "No therapist selected",
        }
    }
}

impl std::fmt::Display for SlotReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SlotReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotVerdict {
    pub disabled: bool,
    pub reason: SlotReason,
}

impl SlotVerdict {
    pub const ENABLED: SlotVerdict = SlotVerdict {
        disabled: false,
        reason: SlotReason::Available,
    };

    pub fn disabled(reason: SlotReason) -> Self {
        Self {
            disabled: true,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailabilityEntry {
    pub slot_id: &'static str,
    pub label: &'static str,
    pub limited: bool,
    #[serde(flatten)]
    pub verdict: SlotVerdict,
}

/// Verdicts for every catalog slot, in catalog display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub date: NaiveDate,
    pub therapist_id: Option<String>,
    pub slots: Vec<SlotAvailabilityEntry>,
}

impl SlotAvailability {
    pub fn get(&self, slot_id: &str) -> Option<&SlotVerdict> {
        self.slots
            .iter()
            .find(|entry| entry.slot_id == slot_id)
            .map(|entry| &entry.verdict)
    }

    pub fn enabled_ids(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|entry| !entry.verdict.disabled)
            .map(|entry| entry.slot_id)
            .collect()
    }
}

/// One calendar cell of the month view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub is_full_holiday: bool,
    pub remaining_normal: u32,
    pub remaining_limited: u32,
    pub booked_count: usize,
    pub bookable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCalendar {
    pub therapist_id: String,
    pub month: CalendarMonth,
    pub days: Vec<DaySummary>,
}

// ==============================================================================
// QUERY PARAMETERS AND ERRORS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateSlotsQuery {
    pub date: String,
    pub therapist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub month: String,
}

#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("Therapist not found: {0}")]
    TherapistNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidDate(_) | AvailabilityError::InvalidMonth(_) => {
                AppError::BadRequest(err.to_string())
            }
            AvailabilityError::TherapistNotFound(_) => AppError::NotFound(err.to_string()),
            AvailabilityError::Backend(backend) => backend.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn holiday_without_flag_is_full_day() {
        let holiday: HolidayRecord = serde_json::from_value(json!({"date": "2025-06-10"})).unwrap();
        assert_eq!(holiday, HolidayRecord::full_day(ymd(2025, 6, 10)));

        let explicit: HolidayRecord =
            serde_json::from_value(json!({"date": "2025-06-10", "isFullDay": true, "slots": [{"slotId": "1000-1045"}]}))
                .unwrap();
        assert_eq!(explicit.kind, HolidayKind::FullDay);
    }

    #[test]
    fn explicit_false_makes_partial_holiday() {
        let holiday: HolidayRecord = serde_json::from_value(json!({
            "date": "2025-6-10",
            "isFullDay": false,
            "slots": [{"slotId": "1000-1045"}, "1045-1130"]
        }))
        .unwrap();

        assert_eq!(holiday, HolidayRecord::partial(ymd(2025, 6, 10), ["1000-1045", "1045-1130"]));
    }

    #[test]
    fn unparseable_holiday_date_never_matches() {
        let holiday: HolidayRecord = serde_json::from_value(json!({"date": "someday"})).unwrap();
        assert_eq!(holiday.date, None);
        assert!(!holiday.applies_to(ymd(2025, 6, 10)));
    }

    #[test]
    fn therapist_accepts_server_shape() {
        let therapist: Therapist = serde_json::from_value(json!({
            "_id": "t-1",
            "fullName": "Meera Nair",
            "holidays": [{"date": "2025-06-12T00:00:00.000Z"}],
            "bookedSlots": {
                "2025-06-10": ["0830-0915"],
                "2025-6-10": ["1000-1045"],
                "garbage": ["1130-1215"]
            }
        }))
        .unwrap();

        assert_eq!(therapist.id, "t-1");
        assert_eq!(therapist.name.as_deref(), Some("Meera Nair"));
        assert_eq!(therapist.holidays.len(), 1);
        let booked = &therapist.booked_slots[&ymd(2025, 6, 10)];
        assert_eq!(booked.len(), 2);
        assert!(booked.contains("0830-0915") && booked.contains("1000-1045"));
        assert_eq!(therapist.booked_slots.len(), 1);
    }

    #[test]
    fn therapist_tolerates_missing_schedule_fields() {
        let therapist: Therapist = serde_json::from_value(json!({"id": "t-2", "bookedSlots": null})).unwrap();
        assert!(therapist.holidays.is_empty());
        assert!(therapist.booked_slots.is_empty());
    }

    #[test]
    fn verdict_serializes_reason_text() {
        let value = serde_json::to_value(SlotVerdict::disabled(SlotReason::FullDayHoliday)).unwrap();
        assert_eq!(value, json!({"disabled": true, "reason": "Unavailable Slot"}));

        let value = serde_json::to_value(SlotVerdict::ENABLED).unwrap();
        assert_eq!(value, json!({"disabled": false, "reason": ""}));
    }
}
