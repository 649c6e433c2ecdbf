// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::extractor::AuthToken;

use crate::models::{CalendarQuery, EvaluateSlotsQuery};
use crate::services::{AvailabilityService, SlotCatalog};

#[axum::debug_handler]
pub async fn list_slots() -> Json<Value> {
    let catalog = SlotCatalog::reference();
    Json(json!({
        "slots": catalog,
        "total": catalog.len()
    }))
}

/// Slot verdicts for a date; the therapist is optional so the form can render
/// the "No therapist selected" state through the same call.
#[axum::debug_handler]
pub async fn evaluate_slots(
    State(config): State<Arc<AppConfig>>,
    token: AuthToken,
    Query(query): Query<EvaluateSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let availability = service
        .evaluate(&query.date, query.therapist_id.as_deref(), token.as_str())
        .await?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn get_therapist_calendar(
    State(config): State<Arc<AppConfig>>,
    token: AuthToken,
    Path(therapist_id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&config);

    let calendar = service
        .month_calendar(&therapist_id, &query.month, token.as_str())
        .await?;

    Ok(Json(json!(calendar)))
}
