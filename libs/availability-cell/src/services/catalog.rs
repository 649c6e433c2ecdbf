use serde::Serialize;

use crate::models::{SlotCategory, TimeSlot};

/// The clinic's bookable slots in display order: ten normal 45-minute slots
/// through the day and five limited ones at the edges.
pub static REFERENCE_SLOTS: [TimeSlot; 15] = [
    TimeSlot::limited("0830-0915", "08:30 AM - 09:15 AM"),
    TimeSlot::limited("0915-1000", "09:15 AM - 10:00 AM"),
    TimeSlot::normal("1000-1045", "10:00 AM - 10:45 AM"),
    TimeSlot::normal("1045-1130", "10:45 AM - 11:30 AM"),
    TimeSlot::normal("1130-1215", "11:30 AM - 12:15 PM"),
    TimeSlot::normal("1215-1300", "12:15 PM - 01:00 PM"),
    TimeSlot::normal("1300-1345", "01:00 PM - 01:45 PM"),
    TimeSlot::normal("1345-1430", "01:45 PM - 02:30 PM"),
    TimeSlot::normal("1430-1515", "02:30 PM - 03:15 PM"),
    TimeSlot::normal("1515-1600", "03:15 PM - 04:00 PM"),
    TimeSlot::normal("1600-1645", "04:00 PM - 04:45 PM"),
    TimeSlot::normal("1645-1730", "04:45 PM - 05:30 PM"),
    TimeSlot::limited("1730-1815", "05:30 PM - 06:15 PM"),
    TimeSlot::limited("1815-1900", "06:15 PM - 07:00 PM"),
    TimeSlot::limited("1900-1945", "07:00 PM - 07:45 PM"),
];

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct SlotCatalog {
    slots: &'static [TimeSlot],
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

impl SlotCatalog {
    pub const fn new(slots: &'static [TimeSlot]) -> Self {
        Self { slots }
    }

    pub fn reference() -> Self {
        Self::new(&REFERENCE_SLOTS)
    }

    pub fn find_slot(&self, id: &str) -> Option<&'static TimeSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn category_of(&self, id: &str) -> Option<SlotCategory> {
        self.find_slot(id).map(TimeSlot::category)
    }

    pub fn slots(&self) -> &'static [TimeSlot] {
        self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn reference_catalog_has_ten_normal_and_five_limited() {
        let catalog = SlotCatalog::reference();
        assert_eq!(catalog.len(), 15);
        assert_eq!(catalog.slots().iter().filter(|s| !s.limited).count(), 10);
        assert_eq!(catalog.slots().iter().filter(|s| s.limited).count(), 5);
    }

    #[test]
    fn slot_ids_are_unique() {
        let ids: HashSet<&str> = REFERENCE_SLOTS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), REFERENCE_SLOTS.len());
    }

    #[test]
    fn find_slot_by_id() {
        let catalog = SlotCatalog::reference();
        assert_eq!(catalog.find_slot("1000-1045").map(|s| s.limited), Some(false));
        assert_eq!(catalog.category_of("0830-0915"), Some(SlotCategory::Limited));
        assert!(catalog.find_slot("2300-2345").is_none());
    }
}
