use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    DailyQuota, SlotAvailability, SlotAvailabilityEntry, SlotReason, SlotVerdict, Therapist,
    TherapistDay,
};
use crate::services::capacity::compute_therapist_day;
use crate::services::catalog::SlotCatalog;

/// Produces a verdict for every catalog slot on one therapist-day.
///
/// Per slot the first matching rule wins: partial-holiday exclusion, existing
/// booking, exhausted limited capacity, exhausted normal capacity. A full-day
/// holiday disables everything and skips the capacity rules.
pub fn evaluate_slots(day: &TherapistDay, catalog: &SlotCatalog) -> SlotAvailability {
    let remaining_normal = day.remaining_normal(catalog);
    let remaining_limited = day.remaining_limited(catalog);

    let slots = catalog
        .slots()
        .iter()
        .map(|slot| {
            let verdict = if day.is_full_holiday {
                SlotVerdict::disabled(SlotReason::FullDayHoliday)
            } else if day.unavailable_slot_ids.contains(slot.id) {
                SlotVerdict::disabled(SlotReason::UnavailableSlot)
            } else if day.booked_slot_ids.contains(slot.id) {
                SlotVerdict::disabled(SlotReason::AlreadyBooked)
            } else if slot.limited && remaining_limited == 0 {
                SlotVerdict::disabled(SlotReason::NoLimitedSlots)
            } else if !slot.limited && remaining_normal == 0 {
                SlotVerdict::disabled(SlotReason::NoNormalSlots)
            } else {
                SlotVerdict::ENABLED
            };

            SlotAvailabilityEntry {
                slot_id: slot.id,
                label: slot.label,
                limited: slot.limited,
                verdict,
            }
        })
        .collect();

    SlotAvailability {
        date: day.date,
        therapist_id: Some(day.therapist_id.clone()),
        slots,
    }
}

fn all_disabled(
    date: NaiveDate,
    therapist_id: Option<&str>,
    catalog: &SlotCatalog,
    reason: SlotReason,
) -> SlotAvailability {
    SlotAvailability {
        date,
        therapist_id: therapist_id.map(str::to_string),
        slots: catalog
            .slots()
            .iter()
            .map(|slot| SlotAvailabilityEntry {
                slot_id: slot.id,
                label: slot.label,
                limited: slot.limited,
                verdict: SlotVerdict::disabled(reason),
            })
            .collect(),
    }
}

/// Evaluates slots for whatever therapist the form currently has selected.
///
/// An empty roster disables every slot with "No therapist data"; a missing
/// selection with "No therapist selected". A selection absent from a
/// non-empty roster is treated as missing data.
pub fn evaluate_selection(
    roster: &[Therapist],
    therapist_id: Option<&str>,
    date: NaiveDate,
    catalog: &SlotCatalog,
    quota: DailyQuota,
) -> SlotAvailability {
    if roster.is_empty() {
        return all_disabled(date, therapist_id, catalog, SlotReason::NoTherapistData);
    }

    let Some(therapist_id) = therapist_id.filter(|id| !id.is_empty()) else {
        return all_disabled(date, None, catalog, SlotReason::NoTherapistSelected);
    };

    match roster.iter().find(|therapist| therapist.id == therapist_id) {
        Some(therapist) => {
            let day = compute_therapist_day(therapist, date, catalog, quota);
            evaluate_slots(&day, catalog)
        }
        None => {
            debug!("Therapist {} not in roster of {}", therapist_id, roster.len());
            all_disabled(date, Some(therapist_id), catalog, SlotReason::NoTherapistData)
        }
    }
}
