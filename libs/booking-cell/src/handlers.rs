// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::extractor::AuthToken;

use crate::models::{BookingError, CheckInRequest, CollectPaymentRequest, CreateDraftRequest, DraftActionRequest};
use crate::router::BookingState;
use crate::services::{validate, DraftSession, InFlightActions};

fn draft_view(session: &DraftSession) -> Value {
    let blocked_by = validate(&session.form).err().map(|reason| reason.to_string());

    json!({
        "id": session.id,
        "form": session.form,
        "quota": session.form.quota(),
        "canSubmit": blocked_by.is_none(),
        "blockedBy": blocked_by,
        "createdAt": session.created_at,
        "updatedAt": session.updated_at
    })
}

// ==============================================================================
// DRAFT FORMS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_draft(
    State(state): State<Arc<BookingState>>,
    token: AuthToken,
    Json(request): Json<CreateDraftRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let catalogs = state.service.fetch_home_details(token.as_str()).await?;
    let form = state.service.open_form(request, &catalogs)?;

    let session = state.drafts.insert(DraftSession::new(form, catalogs)).await;
    info!("Opened booking draft {}", session.id);

    Ok((StatusCode::CREATED, Json(draft_view(&session))))
}

#[axum::debug_handler]
pub async fn get_draft(
    State(state): State<Arc<BookingState>>,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = state.drafts.get(draft_id).await?;
    Ok(Json(draft_view(&session)))
}

#[axum::debug_handler]
pub async fn apply_draft_action(
    State(state): State<Arc<BookingState>>,
    Path(draft_id): Path<Uuid>,
    Json(request): Json<DraftActionRequest>,
) -> Result<Json<Value>, AppError> {
    debug!("Applying {:?} to draft {}", request, draft_id);

    let submit_key = InFlightActions::submit_key(draft_id);
    let session = state
        .drafts
        .update(draft_id, |session| {
            state.actions.ensure_idle(&submit_key)?;
            state.service.apply_action(session, request)
        })
        .await?;

    Ok(Json(draft_view(&session)))
}

#[axum::debug_handler]
pub async fn get_session_slots(
    State(state): State<Arc<BookingState>>,
    Path((draft_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<Value>, AppError> {
    let session = state.drafts.get(draft_id).await?;
    let availability = state.service.session_slots(&session, index)?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn refresh_draft(
    State(state): State<Arc<BookingState>>,
    token: AuthToken,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    // Fail fast on an unknown or submitting draft before calling the backend.
    let submit_key = InFlightActions::submit_key(draft_id);
    state.drafts.get(draft_id).await?;
    state.actions.ensure_idle(&submit_key).map_err(BookingError::from)?;

    let catalogs = state.service.fetch_home_details(token.as_str()).await?;
    let session = state
        .drafts
        .update(draft_id, |session| {
            state.actions.ensure_idle(&submit_key)?;
            state.service.replace_catalogs(session, catalogs);
            Ok(())
        })
        .await?;

    Ok(Json(draft_view(&session)))
}

#[axum::debug_handler]
pub async fn discard_draft(
    State(state): State<Arc<BookingState>>,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let aborted = state.actions.cancel(&InFlightActions::submit_key(draft_id));
    let session = state.drafts.remove(draft_id).await?;

    info!("Discarded booking draft {}", session.id);
    Ok(Json(json!({
        "message": "Draft discarded",
        "id": session.id,
        "abortedSubmit": aborted
    })))
}

#[axum::debug_handler]
pub async fn submit_draft(
    State(state): State<Arc<BookingState>>,
    token: AuthToken,
    Path(draft_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    // The snapshot is read after the key is registered, so every edit either
    // lands before it or is rejected until the submit settles.
    let booking = state
        .actions
        .run(InFlightActions::submit_key(draft_id), async {
            let session = state.drafts.get(draft_id).await?;
            state.service.submit(&session, token.as_str()).await
        })
        .await
        .map_err(BookingError::from)??;

    if state.drafts.remove(draft_id).await.is_err() {
        debug!("Draft {} was already discarded", draft_id);
    }

    Ok(Json(json!({
        "message": "Booking submitted",
        "draftId": draft_id,
        "booking": booking
    })))
}

// ==============================================================================
// EXISTING BOOKINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn collect_payment(
    State(state): State<Arc<BookingState>>,
    token: AuthToken,
    Path(booking_id): Path<String>,
    Json(request): Json<CollectPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let response = state
        .actions
        .run(
            InFlightActions::payment_key(&booking_id),
            state.service.collect_payment(&booking_id, &request, token.as_str()),
        )
        .await
        .map_err(BookingError::from)??;

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn check_in(
    State(state): State<Arc<BookingState>>,
    token: AuthToken,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<Value>, AppError> {
    let response = state
        .actions
        .run(
            InFlightActions::check_in_key(&request.booking_id, &request.session_id),
            state.service.check_in(&request, token.as_str()),
        )
        .await
        .map_err(BookingError::from)??;

    Ok(Json(response))
}
