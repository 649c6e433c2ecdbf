use crate::models::{BookingPayload, BookingValidationError, SessionPayload, TherapyType, TherapyTypeRef};
use crate::services::draft::BookingForm;
use crate::services::validator::validate;

/// Builds the backend booking body from a valid form.
///
/// Every session's therapy type is normalised to `{id, name}` against the
/// therapy catalog, so the backend never sees a bare id.
pub fn build_payload(form: &BookingForm, therapy_catalog: &[TherapyType]) -> Result<BookingPayload, BookingValidationError> {
    validate(form)?;

    let patient = form.patient_id.clone().ok_or(BookingValidationError::PatientMissing)?;
    let package = form
        .package
        .as_ref()
        .map(|package| package.id.clone())
        .ok_or(BookingValidationError::PackageMissing)?;

    let sessions = form
        .sessions()
        .iter()
        .map(|draft| {
            let therapy_type = draft
                .therapy_type
                .as_ref()
                .ok_or(BookingValidationError::TherapyTypeMissing { row: draft.row })?;

            Ok(SessionPayload {
                date: draft.date,
                slot_id: draft.slot_id.clone(),
                therapist_id: draft.therapist_id.clone(),
                therapy_type_id: therapy_type.resolve(therapy_catalog),
            })
        })
        .collect::<Result<Vec<_>, BookingValidationError>>()?;

    let edit = &form.edit;
    Ok(BookingPayload {
        patient,
        therapy: form.therapy_type.as_ref().map(|therapy| TherapyTypeRef::id(therapy).to_string()),
        package,
        therapist: form.therapist_id.clone(),
        sessions,
        coupon: form.coupon.clone(),
        remark: form.remark.clone(),
        booking_request_id: edit.booking_request_id.clone(),
        is_booking_request: edit.is_booking_request.then_some(true),
        is_session_edit_request: edit.is_session_edit_request.then_some(true),
        session_edit_request_id: edit.session_edit_request_id.clone(),
    })
}
