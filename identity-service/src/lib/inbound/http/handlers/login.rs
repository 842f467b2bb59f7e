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

pub async fn login<S: IdentityServicePort>(
    State(state): State<AppState<S>>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let credentials = Credentials::new(body.username, body.password);

    login_response(state.identity_service.login(credentials, body.role).await)
}

/// HTTP request body for logging in (raw JSON)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
    #[serde(default)]
    role: Option<String>,
}
