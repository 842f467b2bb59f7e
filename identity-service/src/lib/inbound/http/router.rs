use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::http::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_credentials::change_credentials;
use super::handlers::create_identity::create_identity;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use crate::domain::identity::ports::IdentityServicePort;

pub struct AppState<S: IdentityServicePort> {
    pub identity_service: Arc<S>,
}

// Derived Clone would require `S: Clone`.
impl<S: IdentityServicePort> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            identity_service: Arc::clone(&self.identity_service),
        }
    }
}

pub fn create_router<S: IdentityServicePort>(
    identity_service: Arc<S>,
    body_limit_bytes: usize,
) -> Router {
    let state = AppState { identity_service };

    let api_routes = Router::new()
        .route("/api/auth/login", post(login::<S>))
        .route("/api/auth/credentials", post(change_credentials::<S>))
        .route("/api/auth/logout", post(logout::<S>))
        .route("/api/identities", post(create_identity::<S>));

    // Headers are left out of the span: they may carry bearer tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(api_routes)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
