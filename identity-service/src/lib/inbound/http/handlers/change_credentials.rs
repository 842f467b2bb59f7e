use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::login_response;
use super::ApiError;
use super::ApiSuccess;
use super::LoginResponseData;
use crate::domain::identity::models::Password;
use crate::domain::identity::ports::IdentityServicePort;
use crate::inbound::http::router::AppState;

/// Rotate the password of the identity the presented token belongs to.
///
/// The token is read from the body first, then from `Authorization: Bearer`.
/// An empty body token counts as absent.
pub async fn change_credentials<S: IdentityServicePort>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<ChangeCredentialsRequest>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    let access_token = body
        .access_token
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(&headers).map(str::to_string));

    login_response(
        state
            .identity_service
            .change_credentials(access_token, Password::new(body.password))
            .await,
    )
}

/// HTTP request body for changing credentials (raw JSON)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeCredentialsRequest {
    password: String,
    #[serde(default)]
    access_token: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );

        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dGVzdGVyOnBhc3N3b3Jk"),
        );

        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
