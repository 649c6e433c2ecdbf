// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use chrono::Duration;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{BookingService, DraftStore, InFlightActions};

/// Shared state of the booking routes: open forms and pending backend actions.
pub struct BookingState {
    pub service: BookingService,
    pub drafts: DraftStore,
    pub actions: InFlightActions,
}

impl BookingState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            service: BookingService::new(config),
            // At least a minute, at most a week.
            drafts: DraftStore::with_max_idle(Duration::minutes(config.draft_idle_minutes.clamp(1, 7 * 24 * 60))),
            actions: InFlightActions::new(),
        }
    }
}

pub fn booking_routes(config: Arc<AppConfig>) -> Router {
    let state = Arc::new(BookingState::new(&config));

    let protected_routes = Router::new()
        // Draft forms
        .route("/drafts", post(handlers::create_draft))
        .route("/drafts/{draft_id}", get(handlers::get_draft).delete(handlers::discard_draft))
        .route("/drafts/{draft_id}/actions", post(handlers::apply_draft_action))
        .route("/drafts/{draft_id}/sessions/{index}/slots", get(handlers::get_session_slots))
        .route("/drafts/{draft_id}/refresh", post(handlers::refresh_draft))
        .route("/drafts/{draft_id}/submit", post(handlers::submit_draft))

        // Existing bookings
        .route("/check-in", post(handlers::check_in))
        .route("/{booking_id}/collect-payment", post(handlers::collect_payment))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
