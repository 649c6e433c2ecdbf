// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/slots", get(handlers::list_slots))
        .route("/evaluate", get(handlers::evaluate_slots))
        .route("/therapists/{therapist_id}/calendar", get(handlers::get_therapist_calendar))
        .layer(middleware::from_fn(auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
