use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::date_key::CalendarMonth;
use crate::models::{DailyQuota, DaySummary, MonthCalendar, Therapist, TherapistDay};
use crate::services::capacity::compute_therapist_day;
use crate::services::catalog::SlotCatalog;
use crate::services::evaluator::evaluate_slots;

/// Therapist-days for one roster and one month, computed once.
///
/// The index is tied to the roster snapshot it was built from; build a new
/// one whenever the roster is refetched or the month changes.
#[derive(Debug, Clone)]
pub struct AvailabilityIndex {
    month: CalendarMonth,
    catalog: SlotCatalog,
    days: HashMap<(String, NaiveDate), TherapistDay>,
}

impl AvailabilityIndex {
    pub fn build(roster: &[Therapist], month: CalendarMonth, catalog: SlotCatalog, quota: DailyQuota) -> Self {
        let days: HashMap<(String, NaiveDate), TherapistDay> = roster
            .iter()
            .flat_map(|therapist| {
                month.days().map(move |date| {
                    (
                        (therapist.id.clone(), date),
                        compute_therapist_day(therapist, date, &catalog, quota),
                    )
                })
            })
            .collect();

        debug!(
            "Built availability index for {} with {} therapist-days",
            month,
            days.len()
        );

        Self { month, catalog, days }
    }

    pub fn day(&self, therapist_id: &str, date: NaiveDate) -> Option<&TherapistDay> {
        self.days.get(&(therapist_id.to_string(), date))
    }

    /// The month view for one therapist; `None` when the therapist is not indexed.
    pub fn month_calendar(&self, therapist_id: &str) -> Option<MonthCalendar> {
        let days: Vec<DaySummary> = self
            .month
            .days()
            .filter_map(|date| self.day(therapist_id, date))
            .map(|day| {
                let remaining_normal = day.remaining_normal(&self.catalog);
                let remaining_limited = day.remaining_limited(&self.catalog);
                let bookable = !day.is_full_holiday
                    && evaluate_slots(day, &self.catalog)
                        .slots
                        .iter()
                        .any(|slot| !slot.verdict.disabled);

                DaySummary {
                    date: day.date,
                    is_full_holiday: day.is_full_holiday,
                    remaining_normal,
                    remaining_limited,
                    booked_count: day.booked_slot_ids.len(),
                    bookable,
                }
            })
            .collect();

        if days.is_empty() {
            return None;
        }

        Some(MonthCalendar {
            therapist_id: therapist_id.to_string(),
            month: self.month,
            days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HolidayRecord;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn june() -> CalendarMonth {
        CalendarMonth::new(2025, 6).unwrap()
    }

    #[test]
    fn indexes_every_day_for_every_therapist() {
        let roster = vec![Therapist::new("t-1"), Therapist::new("t-2")];
        let index = AvailabilityIndex::build(&roster, june(), SlotCatalog::reference(), DailyQuota::default());

        assert!(index.day("t-1", ymd(2025, 6, 1)).is_some());
        assert!(index.day("t-2", ymd(2025, 6, 30)).is_some());
        assert!(index.day("t-1", ymd(2025, 7, 1)).is_none());
        assert!(index.day("t-3", ymd(2025, 6, 1)).is_none());
    }

    #[test]
    fn month_calendar_summarises_holidays_and_bookings() {
        let therapist = Therapist::new("t-1")
            .with_holiday(HolidayRecord::full_day(ymd(2025, 6, 10)))
            .with_holiday(HolidayRecord::partial(ymd(2025, 6, 11), ["0830-0915"]))
            .with_booked(ymd(2025, 6, 11), ["1000-1045", "1045-1130"]);
        let index = AvailabilityIndex::build(&[therapist], june(), SlotCatalog::reference(), DailyQuota::default());

        let calendar = index.month_calendar("t-1").expect("therapist is indexed");
        assert_eq!(calendar.days.len(), 30);

        let holiday = &calendar.days[9];
        assert_eq!(holiday.date, ymd(2025, 6, 10));
        assert!(holiday.is_full_holiday);
        assert!(!holiday.bookable);
        assert_eq!((holiday.remaining_normal, holiday.remaining_limited), (0, 0));

        let partial = &calendar.days[10];
        assert_eq!(partial.remaining_normal, 8);
        assert_eq!(partial.remaining_limited, 4);
        assert_eq!(partial.booked_count, 2);
        assert!(partial.bookable);
    }

    #[test]
    fn unknown_therapist_has_no_calendar() {
        let index = AvailabilityIndex::build(&[], june(), SlotCatalog::reference(), DailyQuota::default());
        assert!(index.month_calendar("t-1").is_none());
    }

    #[test]
    fn indexed_days_match_direct_computation() {
        let date = ymd(2025, 6, 12);
        let therapist = Therapist::new("t-1").with_booked(date, ["1300-1345"]);
        let catalog = SlotCatalog::reference();
        let index = AvailabilityIndex::build(std::slice::from_ref(&therapist), june(), catalog, DailyQuota::default());

        let direct = compute_therapist_day(&therapist, date, &catalog, DailyQuota::default());
        assert_eq!(index.day("t-1", date), Some(&direct));
    }
}
