use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::login_response;
use super::ApiError;
use super::ApiSuccess;
use super::LoginResponseData;
use crate::domain::identity::models::Credentials;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

/// Register an identity and answer with its first session.
///
/// A taken or malformed username yields the same all-null payload as a failed login.
pub async fn create_identity<S: IdentityServicePort>(
    State(state): State<AppState<S>>,
    Json(body): Json<CreateIdentityRequest>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let credentials = Credentials::new(body.username, body.password);

    login_response(state.identity_service.create_identity(credentials).await)
}

/// HTTP request body for creating an identity (raw JSON)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CreateIdentityRequest {
    username: String,
    password: String,
}
