use std::sync::Arc;

use serde_json::{json, Value};

use shared_config::AppConfig;

pub const TEST_TOKEN: &str = "test-session-token";

pub struct TestConfig {
    pub clinic_api_url: String,
    pub daily_normal_quota: u32,
    pub daily_limited_quota: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            clinic_api_url: "http://localhost:8080".to_string(),
            daily_normal_quota: 10,
            daily_limited_quota: 5,
        }
    }
}

impl TestConfig {
    pub fn with_backend(uri: &str) -> Self {
        Self {
            clinic_api_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            clinic_api_url: self.clinic_api_url.clone(),
            daily_normal_quota: self.daily_normal_quota,
            daily_limited_quota: self.daily_limited_quota,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Canned backend payloads shaped like the clinic API responses.
pub struct MockClinicResponses;

impl MockClinicResponses {
    pub fn therapist_response(id: &str, name: &str) -> Value {
        json!({
            "_id": id,
            "name": name,
            "holidays": [],
            "bookedSlots": {}
        })
    }

    pub fn therapist_with_schedule(id: &str, name: &str, holidays: Value, booked_slots: Value) -> Value {
        json!({
            "_id": id,
            "name": name,
            "holidays": holidays,
            "bookedSlots": booked_slots
        })
    }

    pub fn full_day_holiday(date: &str) -> Value {
        json!({ "date": date })
    }

    pub fn partial_holiday(date: &str, slot_ids: &[&str]) -> Value {
        let slots: Vec<Value> = slot_ids.iter().map(|id| json!({ "slotId": id })).collect();
        json!({ "date": date, "isFullDay": false, "slots": slots })
    }

    pub fn patient_response(id: &str, name: &str) -> Value {
        json!({ "_id": id, "name": name })
    }

    pub fn therapy_type_response(id: &str, name: &str) -> Value {
        json!({ "_id": id, "name": name })
    }

    pub fn package_response(id: &str, name: &str, total_sessions: Option<u32>) -> Value {
        json!({ "_id": id, "name": name, "totalSessions": total_sessions })
    }

    pub fn home_details_response(therapists: Vec<Value>) -> Value {
        json!({
            "patients": [Self::patient_response("patient-1", "Aarav")],
            "therapists": therapists,
            "therapyTypes": [
                Self::therapy_type_response("therapy-speech", "Speech Therapy"),
                Self::therapy_type_response("therapy-ot", "Occupational Therapy")
            ],
            "packages": [
                Self::package_response("package-3", "Starter 3 Sessions", Some(3)),
                Self::package_response("package-10", "10 Session Pack", None)
            ],
            "coupons": []
        })
    }

    pub fn booking_response(id: &str) -> Value {
        json!({
            "message": "Booking created",
            "booking": { "_id": id }
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "message": message })
    }
}
