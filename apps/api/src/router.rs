use std::sync::Arc;

use axum::{routing::get, Router};

use availability_cell::router::availability_routes;
use booking_cell::router::booking_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Therapy clinic booking API is running!" }))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/bookings", booking_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use shared_utils::test_utils::{TestConfig, TEST_TOKEN};
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_is_public() {
        let response = create_router(TestConfig::default().to_arc())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cells_are_nested() {
        let app = create_router(TestConfig::default().to_arc());

        let slots = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/availability/slots")
                    .header("Authorization", TEST_TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(slots.status(), StatusCode::OK);

        let drafts = app
            .oneshot(Request::builder().uri("/bookings/check-in").method("POST").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(drafts.status(), StatusCode::UNAUTHORIZED);
    }
}
