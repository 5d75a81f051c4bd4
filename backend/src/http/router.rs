//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (auth, CORS, compression,
//! tracing), and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::auth::require_authorization;
use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Every versioned route sits behind the authorizer; 404s for unknown
    // paths are answered without it.
    let api_v1 = Router::new()
        .route(
            "/venues",
            get(handlers::list_venues).post(handlers::register_venue),
        )
        .route("/venues/types", get(handlers::list_types))
        .route("/venues/{id}", get(handlers::get_venue))
        .route_layer(from_fn_with_state(state.clone(), require_authorization));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, Authorizer, StaticTokenVerifier};
    use crate::db::repositories::LocalRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let config = AuthConfig {
            audience: None,
            authorized_emails: vec!["owner@example.com".to_string()],
        };
        let verifier = StaticTokenVerifier::default().with_token("t", "owner@example.com");
        AppState::new(
            Arc::new(LocalRepository::new()),
            Authorizer::new(&config, Arc::new(verifier)),
        )
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = create_router(state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_venues_require_token() {
        let app = create_router(state());

        let response = app
            .clone()
            .oneshot(Request::get("/v1/venues").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get("/v1/venues/types")
                    .header("authorization", "Bearer t")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
