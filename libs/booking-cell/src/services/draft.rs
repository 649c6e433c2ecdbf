use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{DraftError, EditContext, FormAction, Package, SessionDraft, TherapyTypeRef};

/// The whole state of one booking form: global selections plus session drafts.
///
/// Every mutation goes through a method here (or `apply`), and a rejected
/// mutation leaves the form exactly as it was. No two drafts ever share a
/// non-empty (date, slot) pair, and the draft count never exceeds the
/// package quota.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub patient_id: Option<String>,
    pub package: Option<Package>,
    pub therapist_id: Option<String>,
    pub therapy_type: Option<TherapyTypeRef>,
    pub coupon: Option<String>,
    pub remark: String,
    pub edit: EditContext,
    sessions: Vec<SessionDraft>,
    #[serde(skip)]
    next_row: u32,
}

impl BookingForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[SessionDraft] {
        &self.sessions
    }

    pub fn session(&self, index: usize) -> Result<&SessionDraft, DraftError> {
        self.sessions.get(index).ok_or(DraftError::DraftNotFound(index))
    }

    /// Session limit of the selected package; `None` when unlimited.
    pub fn quota(&self) -> Option<usize> {
        self.package.as_ref().and_then(Package::session_quota)
    }

    pub fn select_patient(&mut self, patient_id: Option<String>) {
        self.patient_id = patient_id;
    }

    pub fn select_therapist(&mut self, therapist_id: Option<String>) {
        self.therapist_id = therapist_id;
    }

    pub fn select_therapy_type(&mut self, therapy_type: Option<TherapyTypeRef>) {
        self.therapy_type = therapy_type;
    }

    pub fn set_coupon(&mut self, coupon: Option<String>) {
        self.coupon = coupon;
    }

    pub fn set_remark(&mut self, remark: impl Into<String>) {
        self.remark = remark.into();
    }

    /// Selects a package, dropping the most recently added drafts when the
    /// new quota is smaller than the current list.
    pub fn set_package(&mut self, package: Option<Package>) {
        self.package = package;

        if let Some(quota) = self.quota() {
            if self.sessions.len() > quota {
                debug!(
                    "Package quota {} truncates {} session drafts",
                    quota,
                    self.sessions.len() - quota
                );
                self.sessions.truncate(quota);
            }
        }
    }

    /// Appends a draft for `date` with no slot and the form's current defaults.
    pub fn add_draft(&mut self, date: NaiveDate) -> Result<&SessionDraft, DraftError> {
        if let Some(quota) = self.quota() {
            if self.sessions.len() >= quota {
                warn!("Rejected session draft for {}: quota {} reached", date, quota);
                return Err(DraftError::QuotaReached { quota });
            }
        }

        let row = self.next_row;
        self.next_row += 1;
        self.sessions.push(SessionDraft {
            row,
            date,
            slot_id: String::new(),
            therapist_id: self.therapist_id.clone(),
            therapy_type: self.therapy_type.clone(),
        });

        Ok(&self.sessions[self.sessions.len() - 1])
    }

    /// Puts `slot_id` on the draft at `index`, refusing a (date, slot) pair
    /// another draft already holds. An empty id clears the slot.
    pub fn set_slot(&mut self, index: usize, slot_id: impl Into<String>) -> Result<(), DraftError> {
        let slot_id = slot_id.into();
        let date = self.session(index)?.date;

        if !slot_id.is_empty() {
            let taken = self
                .sessions
                .iter()
                .enumerate()
                .any(|(other, draft)| other != index && draft.date == date && draft.slot_id == slot_id);

            if taken {
                warn!("Rejected duplicate slot {} on {}", slot_id, date);
                return Err(DraftError::DuplicateSlot { date, slot_id });
            }
        }

        self.sessions[index].slot_id = slot_id;
        Ok(())
    }

    pub fn set_therapist(&mut self, index: usize, therapist_id: Option<String>) -> Result<(), DraftError> {
        self.session(index)?;
        self.sessions[index].therapist_id = therapist_id;
        Ok(())
    }

    pub fn set_therapy_type(&mut self, index: usize, therapy_type: Option<TherapyTypeRef>) -> Result<(), DraftError> {
        self.session(index)?;
        self.sessions[index].therapy_type = therapy_type;
        Ok(())
    }

    pub fn remove_draft(&mut self, index: usize) -> Result<SessionDraft, DraftError> {
        self.session(index)?;
        Ok(self.sessions.remove(index))
    }

    /// Back to an empty form, including the edit context.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, action: FormAction) -> Result<(), DraftError> {
        match action {
            FormAction::SelectPatient(patient_id) => self.select_patient(patient_id),
            FormAction::SetPackage(package) => self.set_package(package),
            FormAction::SelectTherapist(therapist_id) => self.select_therapist(therapist_id),
            FormAction::SelectTherapyType(therapy_type) => self.select_therapy_type(therapy_type),
            FormAction::SetCoupon(coupon) => self.set_coupon(coupon),
            FormAction::SetRemark(remark) => self.set_remark(remark),
            FormAction::AddDraft(date) => {
                self.add_draft(date)?;
            }
            FormAction::SetSlot { index, slot_id } => self.set_slot(index, slot_id)?,
            FormAction::SetTherapist { index, therapist_id } => self.set_therapist(index, therapist_id)?,
            FormAction::SetTherapyType { index, therapy_type } => self.set_therapy_type(index, therapy_type)?,
            FormAction::RemoveDraft(index) => {
                self.remove_draft(index)?;
            }
            FormAction::Reset => self.reset(),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form_with_quota(quota: u32) -> BookingForm {
        let mut form = BookingForm::new();
        form.set_package(Some(Package::new("package", "Pack", Some(quota))));
        form
    }

    fn assert_no_duplicate_pairs(form: &BookingForm) {
        let sessions = form.sessions();
        for (i, a) in sessions.iter().enumerate() {
            for b in &sessions[i + 1..] {
                assert!(
                    !(a.has_slot() && a.date == b.date && a.slot_id == b.slot_id),
                    "duplicate {} on {}",
                    a.slot_id,
                    a.date
                );
            }
        }
    }

    #[test]
    fn sixth_draft_is_rejected_with_quota_five() {
        let mut form = form_with_quota(5);
        for day in 1..=5 {
            form.add_draft(ymd(2025, 6, day)).unwrap();
        }

        let before = form.clone();
        assert_matches!(form.add_draft(ymd(2025, 6, 6)), Err(DraftError::QuotaReached { quota: 5 }));
        assert_eq!(form, before);
        assert_eq!(form.sessions().len(), 5);
    }

    #[test]
    fn package_without_quota_is_unlimited() {
        let mut form = BookingForm::new();
        for day in 1..=20 {
            form.add_draft(ymd(2025, 6, day)).unwrap();
        }
        assert_eq!(form.sessions().len(), 20);
    }

    #[test]
    fn new_drafts_inherit_defaults() {
        let mut form = BookingForm::new();
        form.select_therapist(Some("t-1".into()));
        form.select_therapy_type(Some(TherapyTypeRef::Id("therapy-ot".into())));

        let draft = form.add_draft(ymd(2025, 6, 10)).unwrap().clone();
        assert_eq!(draft.therapist_id.as_deref(), Some("t-1"));
        assert_eq!(draft.therapy_type, Some(TherapyTypeRef::Id("therapy-ot".into())));
        assert!(!draft.has_slot());
    }

    #[test]
    fn same_slot_on_same_date_is_rejected() {
        let mut form = BookingForm::new();
        form.add_draft(ymd(2025, 6, 10)).unwrap();
        form.add_draft(ymd(2025, 6, 10)).unwrap();
        form.set_slot(0, "1000-1045").unwrap();

        let before = form.clone();
        assert_matches!(
            form.set_slot(1, "1000-1045"),
            Err(DraftError::DuplicateSlot { ref slot_id, .. }) if slot_id == "1000-1045"
        );
        assert_eq!(form, before);
    }

    #[test]
    fn same_slot_on_other_date_is_allowed() {
        let mut form = BookingForm::new();
        form.add_draft(ymd(2025, 6, 10)).unwrap();
        form.add_draft(ymd(2025, 6, 11)).unwrap();

        form.set_slot(0, "1000-1045").unwrap();
        form.set_slot(1, "1000-1045").unwrap();
        form.set_slot(0, "1000-1045").unwrap();
    }

    #[test]
    fn duplicate_pairs_never_appear_over_a_sequence() {
        let mut form = BookingForm::new();
        let dates = [ymd(2025, 6, 10), ymd(2025, 6, 11)];
        let slots = ["1000-1045", "1045-1130", ""];

        for step in 0..40usize {
            let date = dates[step % dates.len()];
            if step % 3 == 0 {
                let _ = form.add_draft(date);
            }
            let len = form.sessions().len();
            if len > 0 {
                let _ = form.set_slot((step * 7) % len, slots[step % slots.len()]);
            }
            if step % 11 == 10 {
                let _ = form.remove_draft(0);
            }
            assert_no_duplicate_pairs(&form);
        }
    }

    #[test]
    fn removal_keeps_row_identity() {
        let mut form = BookingForm::new();
        for day in 10..13 {
            form.add_draft(ymd(2025, 6, day)).unwrap();
        }

        let removed = form.remove_draft(1).unwrap();
        assert_eq!(removed.row, 1);
        let rows: Vec<u32> = form.sessions().iter().map(|draft| draft.row).collect();
        assert_eq!(rows, vec![0, 2]);

        let added = form.add_draft(ymd(2025, 6, 13)).unwrap();
        assert_eq!(added.row, 3);
    }

    #[test]
    fn per_row_edits_touch_only_that_row() {
        let mut form = BookingForm::new();
        form.select_therapist(Some("t-1".into()));
        form.add_draft(ymd(2025, 6, 10)).unwrap();
        form.add_draft(ymd(2025, 6, 11)).unwrap();

        form.set_therapist(1, Some("t-2".into())).unwrap();
        form.set_therapy_type(1, Some(TherapyTypeRef::Id("therapy-speech".into()))).unwrap();

        assert_eq!(form.sessions()[0].therapist_id.as_deref(), Some("t-1"));
        assert_eq!(form.sessions()[0].therapy_type, None);
        assert_eq!(form.sessions()[1].therapist_id.as_deref(), Some("t-2"));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut form = BookingForm::new();
        assert_matches!(form.set_slot(0, "1000-1045"), Err(DraftError::DraftNotFound(0)));
        assert_matches!(form.set_therapist(2, None), Err(DraftError::DraftNotFound(2)));
        assert_matches!(form.remove_draft(0), Err(DraftError::DraftNotFound(0)));
    }

    #[test]
    fn smaller_package_truncates_latest_drafts() {
        let mut form = BookingForm::new();
        for day in 10..15 {
            form.add_draft(ymd(2025, 6, day)).unwrap();
        }

        form.set_package(Some(Package::new("p", "Starter 3 Sessions", None)));

        let dates: Vec<NaiveDate> = form.sessions().iter().map(|draft| draft.date).collect();
        assert_eq!(dates, vec![ymd(2025, 6, 10), ymd(2025, 6, 11), ymd(2025, 6, 12)]);
    }

    #[test]
    fn zero_session_count_does_not_empty_the_form() {
        let mut form = BookingForm::new();
        form.add_draft(ymd(2025, 6, 10)).unwrap();

        let package: Package =
            serde_json::from_value(serde_json::json!({"_id": "p", "name": "10 Session Pack", "totalSessions": 0}))
                .unwrap();
        form.set_package(Some(package));

        assert_eq!(form.quota(), Some(10));
        assert_eq!(form.sessions().len(), 1);
        form.add_draft(ymd(2025, 6, 11)).unwrap();
    }

    #[test]
    fn reset_clears_everything() {
        let mut form = form_with_quota(5);
        form.select_patient(Some("patient-1".into()));
        form.set_coupon(Some("WELCOME".into()));
        form.set_remark("first visit");
        form.edit.booking_id = Some("booking-1".into());
        form.add_draft(ymd(2025, 6, 10)).unwrap();

        form.apply(FormAction::Reset).unwrap();

        assert_eq!(form, BookingForm::new());
        assert_eq!(form.add_draft(ymd(2025, 6, 10)).unwrap().row, 0);
    }

    #[test]
    fn apply_routes_actions() {
        let mut form = BookingForm::new();
        form.apply(FormAction::AddDraft(ymd(2025, 6, 10))).unwrap();
        form.apply(FormAction::SetSlot {
            index: 0,
            slot_id: "0830-0915".into(),
        })
        .unwrap();
        form.apply(FormAction::SetRemark("bring reports".into())).unwrap();

        assert_eq!(form.sessions()[0].slot_id, "0830-0915");
        assert_eq!(form.remark, "bring reports");
        assert_matches!(form.apply(FormAction::RemoveDraft(4)), Err(DraftError::DraftNotFound(4)));
    }
}
