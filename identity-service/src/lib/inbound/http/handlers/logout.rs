use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::identity::models::LogoutOutcome;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

pub async fn logout<S: IdentityServicePort>(
    State(state): State<AppState<S>>,
) -> ApiSuccess<LogoutResponseData> {
    let outcome = state.identity_service.logout().await;
    ApiSuccess::new(StatusCode::OK, outcome.into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutResponseData {
    pub is_logged_out: bool,
}

impl From<LogoutOutcome> for LogoutResponseData {
    fn from(outcome: LogoutOutcome) -> Self {
        Self {
            is_logged_out: outcome.is_logged_out,
        }
    }
}
