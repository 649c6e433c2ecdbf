use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use availability_cell::services::availability::HOME_DETAILS_PATH;
use availability_cell::{AvailabilityService, SlotAvailability};
use shared_backend::ClinicApiClient;
use shared_config::AppConfig;

use crate::models::{
    BookingError, CheckInRequest, CollectPaymentRequest, CreateDraftRequest, DraftActionRequest, DraftError,
    FormAction, HomeDetails, PaymentType,
};
use crate::services::draft::BookingForm;
use crate::services::payload::build_payload;
use crate::services::store::DraftSession;

pub const BOOKINGS_PATH: &str = "/api/admin/bookings";
pub const CHECK_IN_PATH: &str = "/api/admin/bookings/check-in";

pub struct BookingService {
    client: ClinicApiClient,
    availability: AvailabilityService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
            availability: AvailabilityService::new(config),
        }
    }

    /// Patients, therapists, therapy types, packages and coupons in one call.
    pub async fn fetch_home_details(&self, auth_token: &str) -> Result<HomeDetails, BookingError> {
        debug!("Fetching booking home details");

        let details: HomeDetails = self
            .client
            .request(Method::GET, HOME_DETAILS_PATH, Some(auth_token), None)
            .await?;

        debug!(
            "Home details: {} patients, {} therapists, {} packages",
            details.patients.len(),
            details.therapists.len(),
            details.packages.len()
        );

        Ok(details)
    }

    /// A fresh form with the requested initial selections applied.
    pub fn open_form(&self, request: CreateDraftRequest, catalogs: &HomeDetails) -> Result<BookingForm, BookingError> {
        let mut form = BookingForm::new();
        form.edit = request.edit;

        let package = match request.package_id {
            Some(package_id) => Some(
                catalogs
                    .find_package(&package_id)
                    .cloned()
                    .ok_or(BookingError::UnknownPackage(package_id))?,
            ),
            None => None,
        };

        form.apply(FormAction::SelectPatient(request.patient_id))?;
        form.apply(FormAction::SetPackage(package))?;
        form.apply(FormAction::SelectTherapist(request.therapist_id))?;
        form.apply(FormAction::SelectTherapyType(request.therapy_type_id))?;

        Ok(form)
    }

    /// Translates a client action into a form transition against the session catalogs.
    pub fn resolve_action(&self, request: DraftActionRequest, catalogs: &HomeDetails) -> Result<FormAction, BookingError> {
        let action = match request {
            DraftActionRequest::SelectPatient { patient_id } => FormAction::SelectPatient(patient_id),
            DraftActionRequest::SelectPackage { package_id } => {
                let package = match package_id {
                    Some(package_id) => Some(
                        catalogs
                            .find_package(&package_id)
                            .cloned()
                            .ok_or(BookingError::UnknownPackage(package_id))?,
                    ),
                    None => None,
                };
                FormAction::SetPackage(package)
            }
            DraftActionRequest::SelectTherapist { therapist_id } => FormAction::SelectTherapist(therapist_id),
            DraftActionRequest::SelectTherapyType { therapy_type_id } => FormAction::SelectTherapyType(therapy_type_id),
            DraftActionRequest::SetCoupon { coupon } => FormAction::SetCoupon(coupon),
            DraftActionRequest::SetRemark { remark } => FormAction::SetRemark(remark),
            DraftActionRequest::AddDraft { date } => FormAction::AddDraft(date),
            DraftActionRequest::SetSlot { index, slot_id } => FormAction::SetSlot { index, slot_id },
            DraftActionRequest::SetTherapist { index, therapist_id } => FormAction::SetTherapist { index, therapist_id },
            DraftActionRequest::SetTherapyType { index, therapy_type_id } => FormAction::SetTherapyType {
                index,
                therapy_type: therapy_type_id,
            },
            DraftActionRequest::RemoveDraft { index } => FormAction::RemoveDraft(index),
            DraftActionRequest::Reset => FormAction::Reset,
        };

        Ok(action)
    }

    /// Applies a client action. Slot picks are checked against the row's
    /// therapist and date first, so a disabled slot never enters the form.
    pub fn apply_action(&self, session: &mut DraftSession, request: DraftActionRequest) -> Result<(), BookingError> {
        let action = self.resolve_action(request, &session.catalogs)?;

        if let FormAction::SetSlot { index, slot_id } = &action {
            if !slot_id.is_empty() {
                self.ensure_slot_available(session, *index, slot_id)?;
            }
        }

        session.form.apply(action)?;
        Ok(())
    }

    /// Slot verdicts for one draft row: its therapist, its date, the session roster.
    pub fn session_slots(&self, session: &DraftSession, index: usize) -> Result<SlotAvailability, BookingError> {
        let draft = session.form.session(index)?;
        Ok(self
            .availability
            .evaluate_with_roster(&session.catalogs.therapists, draft.therapist_id.as_deref(), draft.date))
    }

    /// Swaps in freshly fetched catalogs, re-reading the selected package so
    /// a changed session count takes effect. A package that is no longer
    /// listed is cleared.
    pub fn replace_catalogs(&self, session: &mut DraftSession, catalogs: HomeDetails) {
        if let Some(selected) = session.form.package.as_ref().map(|package| package.id.clone()) {
            let refreshed = catalogs.find_package(&selected).cloned();
            if refreshed.is_none() {
                warn!("Package {} is no longer offered, clearing it from draft {}", selected, session.id);
            }
            session.form.set_package(refreshed);
        }

        session.catalogs = catalogs;
    }

    fn ensure_slot_available(&self, session: &DraftSession, index: usize, slot_id: &str) -> Result<(), BookingError> {
        let draft = session.form.session(index)?;
        let availability = self.session_slots(session, index)?;

        let verdict = availability
            .get(slot_id)
            .ok_or_else(|| DraftError::UnknownSlot(slot_id.to_string()))?;

        if verdict.disabled {
            warn!(
                "Slot {} on {} rejected for draft {}: {}",
                slot_id, draft.date, session.id, verdict.reason
            );
            return Err(DraftError::SlotUnavailable {
                slot_id: slot_id.to_string(),
                reason: verdict.reason.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Creates the booking, or updates it when the form edits an existing one.
    pub async fn submit(&self, session: &DraftSession, auth_token: &str) -> Result<Value, BookingError> {
        let payload = build_payload(&session.form, &session.catalogs.therapy_types)?;
        let body = serde_json::to_value(&payload).map_err(shared_backend::BackendError::from)?;

        let (method, path) = match session.form.edit.booking_id.as_deref() {
            Some(booking_id) => (Method::PUT, format!("{}/{}", BOOKINGS_PATH, booking_id)),
            None => (Method::POST, BOOKINGS_PATH.to_string()),
        };

        info!(
            "Submitting draft {} with {} sessions ({} {})",
            session.id,
            payload.sessions.len(),
            method,
            path
        );

        let response: Value = self
            .client
            .request(method, &path, Some(auth_token), Some(body))
            .await
            .inspect_err(|e| error!("Booking submission for draft {} failed: {}", session.id, e))?;

        info!("Draft {} submitted", session.id);
        Ok(response)
    }

    pub async fn collect_payment(
        &self,
        booking_id: &str,
        request: &CollectPaymentRequest,
        auth_token: &str,
    ) -> Result<Value, BookingError> {
        if booking_id.trim().is_empty() {
            return Err(BookingError::InvalidPayment("booking id is required".to_string()));
        }

        let request = match request.payment_type {
            PaymentType::Partial => match request.partial_amount {
                Some(amount) if amount.is_finite() && amount > 0.0 => request.clone(),
                _ => {
                    return Err(BookingError::InvalidPayment(
                        "partial payments need a positive partialAmount".to_string(),
                    ))
                }
            },
            PaymentType::Full => CollectPaymentRequest {
                payment_type: PaymentType::Full,
                partial_amount: None,
            },
        };

        let body = serde_json::to_value(&request).map_err(shared_backend::BackendError::from)?;
        let path = format!("{}/{}/collect-payment", BOOKINGS_PATH, booking_id);

        info!("Collecting {:?} payment for booking {}", request.payment_type, booking_id);
        let response = self
            .client
            .request(Method::POST, &path, Some(auth_token), Some(body))
            .await
            .inspect_err(|e| error!("Payment collection for booking {} failed: {}", booking_id, e))?;

        Ok(response)
    }

    pub async fn check_in(&self, request: &CheckInRequest, auth_token: &str) -> Result<Value, BookingError> {
        if request.booking_id.trim().is_empty() || request.session_id.trim().is_empty() {
            return Err(BookingError::InvalidCheckIn(
                "bookingId and sessionId are required".to_string(),
            ));
        }

        let body = serde_json::to_value(request).map_err(shared_backend::BackendError::from)?;

        info!("Checking in session {} of booking {}", request.session_id, request.booking_id);
        let response = self
            .client
            .request(Method::POST, CHECK_IN_PATH, Some(auth_token), Some(body))
            .await
            .inspect_err(|e| error!("Check-in for booking {} failed: {}", request.booking_id, e))?;

        Ok(response)
    }
}
