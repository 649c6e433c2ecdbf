use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use availability_cell::date_key::deserialize_date_key;
use availability_cell::Therapist;
use shared_backend::BackendError;
use shared_models::error::AppError;

// ==============================================================================
// HOME-DETAILS CATALOGS (server-sourced)
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
}

/// A therapy type as listed in the catalog and as sent in booking payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TherapyType {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl TherapyType {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

static FIRST_NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+").ok());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub total_sessions: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub session_count: Option<u32>,
}

impl Package {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_sessions: Option<u32>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_sessions,
            session_count: None,
        }
    }

    /// Maximum number of session drafts the package allows.
    ///
    /// Falls back to the first number in the package name ("10 Session Pack")
    /// when the backend sends no explicit count. A zero count is treated as
    /// missing. `None` means unlimited.
    pub fn session_quota(&self) -> Option<usize> {
        let explicit = [self.total_sessions, self.session_count]
            .into_iter()
            .flatten()
            .find(|count| *count > 0);
        if let Some(count) = explicit {
            return Some(count as usize);
        }

        FIRST_NUMBER
            .as_ref()?
            .find(&self.name)
            .and_then(|found| found.as_str().parse().ok())
            .filter(|count: &usize| *count > 0)
    }
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeDetails {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default, skip_serializing)]
    pub therapists: Vec<Therapist>,
    #[serde(default)]
    pub therapy_types: Vec<TherapyType>,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub coupons: Vec<Value>,
}

impl HomeDetails {
    pub fn find_package(&self, package_id: &str) -> Option<&Package> {
        self.packages.iter().find(|package| package.id == package_id)
    }
}

// ==============================================================================
// SESSION DRAFTS
// ==============================================================================

/// Therapy type as it arrives from clients: either a bare id or an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TherapyTypeRef {
    Ref {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        name: String,
    },
    Id(String),
}

impl TherapyTypeRef {
    pub fn id(&self) -> &str {
        match self {
            TherapyTypeRef::Ref { id, .. } | TherapyTypeRef::Id(id) => id,
        }
    }

    /// An object needs both id and name; a bare id must be non-empty.
    pub fn is_resolved(&self) -> bool {
        match self {
            TherapyTypeRef::Ref { id, name } => !id.is_empty() && !name.is_empty(),
            TherapyTypeRef::Id(id) => !id.is_empty(),
        }
    }

    /// Normalises to `{id, name}`, looking the name up in the catalog when
    /// only an id is known. Unknown ids keep an empty name.
    pub fn resolve(&self, catalog: &[TherapyType]) -> TherapyType {
        match self {
            TherapyTypeRef::Ref { id, name } if !name.is_empty() => TherapyType::new(id.clone(), name.clone()),
            _ => {
                let id = self.id();
                catalog
                    .iter()
                    .find(|therapy| therapy.id == id)
                    .cloned()
                    .unwrap_or_else(|| TherapyType::new(id, ""))
            }
        }
    }
}

impl From<TherapyType> for TherapyTypeRef {
    fn from(therapy: TherapyType) -> Self {
        TherapyTypeRef::Ref {
            id: therapy.id,
            name: therapy.name,
        }
    }
}

/// One proposed session in the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    /// Stable row identity; survives removal of other rows.
    pub row: u32,
    pub date: NaiveDate,
    /// Empty until a slot is picked.
    pub slot_id: String,
    pub therapist_id: Option<String>,
    #[serde(rename = "therapyTypeId")]
    pub therapy_type: Option<TherapyTypeRef>,
}

impl SessionDraft {
    pub fn has_slot(&self) -> bool {
        !self.slot_id.is_empty()
    }
}

/// Context carried when the form edits an existing booking or answers a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditContext {
    pub booking_id: Option<String>,
    pub booking_request_id: Option<String>,
    #[serde(default)]
    pub is_booking_request: bool,
    #[serde(default)]
    pub is_session_edit_request: bool,
    pub session_edit_request_id: Option<String>,
}

/// Reducer transitions of the booking form, with catalog lookups already resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    SelectPatient(Option<String>),
    SetPackage(Option<Package>),
    SelectTherapist(Option<String>),
    SelectTherapyType(Option<TherapyTypeRef>),
    SetCoupon(Option<String>),
    SetRemark(String),
    AddDraft(NaiveDate),
    SetSlot { index: usize, slot_id: String },
    SetTherapist { index: usize, therapist_id: Option<String> },
    SetTherapyType { index: usize, therapy_type: Option<TherapyTypeRef> },
    RemoveDraft(usize),
    Reset,
}

/// Wire form of a draft mutation as posted by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DraftActionRequest {
    SelectPatient {
        patient_id: Option<String>,
    },
    SelectPackage {
        package_id: Option<String>,
    },
    SelectTherapist {
        therapist_id: Option<String>,
    },
    SelectTherapyType {
        therapy_type_id: Option<TherapyTypeRef>,
    },
    SetCoupon {
        coupon: Option<String>,
    },
    SetRemark {
        #[serde(default)]
        remark: String,
    },
    AddDraft {
        #[serde(deserialize_with = "deserialize_date_key")]
        date: NaiveDate,
    },
    SetSlot {
        index: usize,
        slot_id: String,
    },
    SetTherapist {
        index: usize,
        therapist_id: Option<String>,
    },
    SetTherapyType {
        index: usize,
        therapy_type_id: Option<TherapyTypeRef>,
    },
    RemoveDraft {
        index: usize,
    },
    Reset,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftRequest {
    pub patient_id: Option<String>,
    pub package_id: Option<String>,
    pub therapist_id: Option<String>,
    pub therapy_type_id: Option<TherapyTypeRef>,
    #[serde(flatten)]
    pub edit: EditContext,
}

// ==============================================================================
// BACKEND PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub date: NaiveDate,
    pub slot_id: String,
    pub therapist_id: Option<String>,
    pub therapy_type_id: TherapyType,
}

/// Body of `POST /api/admin/bookings` and `PUT /api/admin/bookings/:id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub patient: String,
    pub therapy: Option<String>,
    pub package: String,
    pub therapist: Option<String>,
    pub sessions: Vec<SessionPayload>,
    pub coupon: Option<String>,
    pub remark: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_booking_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_session_edit_request: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_edit_request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Full,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectPaymentRequest {
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub booking_id: String,
    pub session_id: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Rejected form mutations. The form is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Session quota of {quota} reached for the selected package")]
    QuotaReached { quota: usize },

    #[error("Slot {slot_id} on {date} is already selected in another session")]
    DuplicateSlot { date: NaiveDate, slot_id: String },

    #[error("No session draft at index {0}")]
    DraftNotFound(usize),

    #[error("Slot {slot_id} is not available: {reason}")]
    SlotUnavailable { slot_id: String, reason: String },

    #[error("Unknown slot: {0}")]
    UnknownSlot(String),
}

/// The first submit rule a form fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingValidationError {
    #[error("Patient is required")]
    PatientMissing,

    #[error("Package is required")]
    PackageMissing,

    #[error("At least one session is required")]
    NoSessions,

    #[error("The first session needs a time slot")]
    FirstSessionWithoutSlot,

    #[error("Slot {slot_id} on {date} is booked more than once")]
    DuplicateSession { date: NaiveDate, slot_id: String },

    #[error("Session {row} has no therapy type")]
    TherapyTypeMissing { row: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Action already in progress: {0}")]
    AlreadyInFlight(String),

    #[error("Action was cancelled: {0}")]
    Aborted(String),
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Validation(#[from] BookingValidationError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("Draft not found: {0}")]
    DraftSessionNotFound(Uuid),

    #[error("Package not found: {0}")]
    UnknownPackage(String),

    #[error("Invalid payment request: {0}")]
    InvalidPayment(String),

    #[error("Invalid check-in request: {0}")]
    InvalidCheckIn(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Draft(DraftError::DraftNotFound(_)) | BookingError::DraftSessionNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            BookingError::Draft(DraftError::UnknownSlot(_))
            | BookingError::UnknownPackage(_)
            | BookingError::InvalidPayment(_)
            | BookingError::InvalidCheckIn(_) => AppError::BadRequest(err.to_string()),
            BookingError::Draft(_) | BookingError::Action(_) => AppError::Conflict(err.to_string()),
            BookingError::Validation(_) => AppError::ValidationError(err.to_string()),
            BookingError::Backend(backend) => backend.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn package_quota_prefers_explicit_counts() {
        let package: Package =
            serde_json::from_value(json!({"_id": "p", "name": "12 Pack", "totalSessions": 3})).unwrap();
        assert_eq!(package.session_quota(), Some(3));

        let package: Package =
            serde_json::from_value(json!({"_id": "p", "name": "12 Pack", "sessionCount": "4"})).unwrap();
        assert_eq!(package.session_quota(), Some(4));
    }

    #[test]
    fn package_quota_falls_back_to_name() {
        let package: Package =
            serde_json::from_value(json!({"_id": "p", "name": "10 Session Pack", "totalSessions": null})).unwrap();
        assert_eq!(package.session_quota(), Some(10));

        assert_eq!(Package::new("p", "Unlimited", None).session_quota(), None);
    }

    #[test]
    fn zero_counts_are_treated_as_missing() {
        let package: Package =
            serde_json::from_value(json!({"_id": "p", "name": "10 Session Pack", "totalSessions": 0})).unwrap();
        assert_eq!(package.session_quota(), Some(10));

        let package: Package = serde_json::from_value(
            json!({"_id": "p", "name": "Pack", "totalSessions": 0, "sessionCount": 6}),
        )
        .unwrap();
        assert_eq!(package.session_quota(), Some(6));

        assert_eq!(Package::new("p", "Trial 0", Some(0)).session_quota(), None);
    }

    #[test]
    fn therapy_type_ref_accepts_both_shapes() {
        let bare: TherapyTypeRef = serde_json::from_value(json!("therapy-ot")).unwrap();
        assert_eq!(bare, TherapyTypeRef::Id("therapy-ot".into()));

        let object: TherapyTypeRef =
            serde_json::from_value(json!({"_id": "therapy-ot", "name": "Occupational Therapy"})).unwrap();
        assert!(object.is_resolved());

        let nameless: TherapyTypeRef = serde_json::from_value(json!({"id": "therapy-ot"})).unwrap();
        assert!(!nameless.is_resolved());
        assert!(!TherapyTypeRef::Id(String::new()).is_resolved());
    }

    #[test]
    fn resolution_is_shape_independent() {
        let catalog = vec![TherapyType::new("therapy-ot", "Occupational Therapy")];
        let from_id = TherapyTypeRef::Id("therapy-ot".into()).resolve(&catalog);
        let from_ref = TherapyTypeRef::from(catalog[0].clone()).resolve(&catalog);

        assert_eq!(from_id, from_ref);
        assert_eq!(
            TherapyTypeRef::Id("therapy-x".into()).resolve(&catalog),
            TherapyType::new("therapy-x", "")
        );
    }

    #[test]
    fn action_requests_use_tagged_camel_case() {
        let action: DraftActionRequest =
            serde_json::from_value(json!({"type": "setSlot", "index": 1, "slotId": "1000-1045"})).unwrap();
        assert!(matches!(action, DraftActionRequest::SetSlot { index: 1, ref slot_id } if slot_id == "1000-1045"));

        let action: DraftActionRequest =
            serde_json::from_value(json!({"type": "addDraft", "date": "2025/6/10"})).unwrap();
        assert!(matches!(action, DraftActionRequest::AddDraft { date } if date.to_string() == "2025-06-10"));

        let action: DraftActionRequest = serde_json::from_value(json!({"type": "reset"})).unwrap();
        assert!(matches!(action, DraftActionRequest::Reset));
    }

    #[test]
    fn errors_map_to_http_statuses() {
        let quota: AppError = BookingError::from(DraftError::QuotaReached { quota: 5 }).into();
        assert_eq!(quota.status(), axum::http::StatusCode::CONFLICT);

        let missing: AppError = BookingError::from(DraftError::DraftNotFound(3)).into();
        assert_eq!(missing.status(), axum::http::StatusCode::NOT_FOUND);

        let invalid: AppError = BookingError::from(BookingValidationError::NoSessions).into();
        assert_eq!(invalid.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
