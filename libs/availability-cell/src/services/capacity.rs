use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{DailyQuota, HolidayKind, SlotCategory, Therapist, TherapistDay};
use crate::services::catalog::SlotCatalog;

/// Derives a therapist's capacity for one date.
///
/// Missing schedule data degrades to "no holidays, no bookings"; nothing here fails.
pub fn compute_therapist_day(
    therapist: &Therapist,
    date: NaiveDate,
    catalog: &SlotCatalog,
    quota: DailyQuota,
) -> TherapistDay {
    let holidays: Vec<&HolidayKind> = therapist
        .holidays
        .iter()
        .filter(|holiday| holiday.applies_to(date))
        .map(|holiday| &holiday.kind)
        .collect();

    if holidays.iter().any(|kind| matches!(kind, HolidayKind::FullDay)) {
        debug!("Therapist {} on full-day holiday {}", therapist.id, date);
        return TherapistDay {
            therapist_id: therapist.id.clone(),
            date,
            normal_capacity: 0,
            limited_capacity: 0,
            booked_slot_ids: BTreeSet::new(),
            unavailable_slot_ids: BTreeSet::new(),
            is_full_holiday: true,
        };
    }

    let unavailable_slot_ids: BTreeSet<String> = holidays
        .into_iter()
        .filter_map(|kind| match kind {
            HolidayKind::Partial(slots) => Some(slots.iter().cloned()),
            HolidayKind::FullDay => None,
        })
        .flatten()
        .collect();

    let mut normal_capacity = quota.normal;
    let mut limited_capacity = quota.limited;
    for slot_id in &unavailable_slot_ids {
        match catalog.category_of(slot_id) {
            Some(SlotCategory::Normal) => normal_capacity = normal_capacity.saturating_sub(1),
            Some(SlotCategory::Limited) => limited_capacity = limited_capacity.saturating_sub(1),
            None => debug!("Partial holiday names unknown slot {}", slot_id),
        }
    }

    let booked_slot_ids = therapist.booked_slots.get(&date).cloned().unwrap_or_default();

    TherapistDay {
        therapist_id: therapist.id.clone(),
        date,
        normal_capacity,
        limited_capacity,
        booked_slot_ids,
        unavailable_slot_ids,
        is_full_holiday: false,
    }
}

impl TherapistDay {
    /// Bookings that consume `category` capacity.
    ///
    /// Booked ids missing from the catalog are counted as normal bookings. Slots
    /// already excluded by a partial holiday have been deducted once and are
    /// not counted again.
    pub fn booked_in(&self, category: SlotCategory, catalog: &SlotCatalog) -> u32 {
        let count = self
            .booked_slot_ids
            .iter()
            .filter(|id| !self.unavailable_slot_ids.contains(*id))
            .filter(|id| catalog.category_of(id).unwrap_or(SlotCategory::Normal) == category)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn remaining_normal(&self, catalog: &SlotCatalog) -> u32 {
        if self.is_full_holiday {
            return 0;
        }
        self.normal_capacity
            .saturating_sub(self.booked_in(SlotCategory::Normal, catalog))
    }

    pub fn remaining_limited(&self, catalog: &SlotCatalog) -> u32 {
        if self.is_full_holiday {
            return 0;
        }
        self.limited_capacity
            .saturating_sub(self.booked_in(SlotCategory::Limited, catalog))
    }
}
