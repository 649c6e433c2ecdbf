use std::collections::HashSet;

use tracing::debug;

use crate::models::{BookingValidationError, TherapyTypeRef};
use crate::services::draft::BookingForm;

/// Returns the first submit rule the form fails, if any.
pub fn validate(form: &BookingForm) -> Result<(), BookingValidationError> {
    if form.patient_id.as_deref().is_none_or(str::is_empty) {
        return Err(BookingValidationError::PatientMissing);
    }

    if form.package.is_none() {
        return Err(BookingValidationError::PackageMissing);
    }

    let sessions = form.sessions();
    let earliest = sessions
        .iter()
        .min_by_key(|draft| draft.date)
        .ok_or(BookingValidationError::NoSessions)?;

    if !earliest.has_slot() {
        return Err(BookingValidationError::FirstSessionWithoutSlot);
    }

    let mut seen = HashSet::new();
    for draft in sessions.iter().filter(|draft| draft.has_slot()) {
        if !seen.insert((draft.date, draft.slot_id.as_str())) {
            return Err(BookingValidationError::DuplicateSession {
                date: draft.date,
                slot_id: draft.slot_id.clone(),
            });
        }
    }

    if let Some(draft) = sessions
        .iter()
        .find(|draft| !draft.therapy_type.as_ref().is_some_and(TherapyTypeRef::is_resolved))
    {
        return Err(BookingValidationError::TherapyTypeMissing { row: draft.row });
    }

    Ok(())
}

pub fn can_submit(form: &BookingForm) -> bool {
    match validate(form) {
        Ok(()) => true,
        Err(reason) => {
            debug!("Form not submittable: {}", reason);
            false
        }
    }
}
