use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::identity::models::AuthOutcome;
use crate::identity::errors::IdentityError;

pub mod change_credentials;
pub mod create_identity;
pub mod health;
pub mod login;
pub mod logout;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Infrastructure failures only.
///
/// Rejected credentials never become an `ApiError`; they are answered with
/// the all-null [`LoginResponseData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        tracing::error!(error = %err, "Identity operation failed");

        match err {
            IdentityError::DatabaseError(_) => {
                ApiError::ServiceUnavailable("Identity store unavailable".to_string())
            }
            IdentityError::InvalidUsername(_)
            | IdentityError::InvalidRole(_)
            | IdentityError::UsernameAlreadyExists(_)
            | IdentityError::Password(_)
            | IdentityError::Token(_)
            | IdentityError::Unknown(_) => {
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

/// Response data shared by login, registration and credential rotation.
///
/// Every field is `null` when the request was rejected, whatever the cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponseData {
    pub identity_id: Option<String>,
    pub role: Option<String>,
    pub access_token: Option<String>,
}

impl LoginResponseData {
    pub fn invalid() -> Self {
        Self {
            identity_id: None,
            role: None,
            access_token: None,
        }
    }
}

impl From<AuthOutcome> for LoginResponseData {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Authenticated(session) => Self {
                identity_id: Some(session.identity_id.to_string()),
                role: Some(session.role.as_str().to_string()),
                access_token: Some(session.access_token),
            },
            AuthOutcome::Rejected => Self::invalid(),
        }
    }
}

/// Map an engine result onto the HTTP response shared by the credential endpoints.
pub(crate) fn login_response(
    result: Result<AuthOutcome, IdentityError>,
) -> Result<ApiSuccess<LoginResponseData>, ApiError> {
    result
        .map_err(ApiError::from)
        .map(|outcome| ApiSuccess::new(StatusCode::OK, outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::models::IdentityId;
    use crate::domain::identity::models::Role;
    use crate::domain::identity::models::Session;

    #[test]
    fn test_rejection_maps_to_all_null_payload() {
        let value = serde_json::to_value(LoginResponseData::from(AuthOutcome::Rejected)).unwrap();

        assert_eq!(
            value,
            serde_json::json!({ "identity_id": null, "role": null, "access_token": null })
        );
    }

    #[test]
    fn test_session_maps_to_payload() {
        let identity_id = IdentityId::new();
        let outcome = AuthOutcome::Authenticated(Session {
            identity_id,
            role: Role::new("identity".to_string()).unwrap(),
            access_token: "token".to_string(),
        });

        let data = LoginResponseData::from(outcome);

        assert_eq!(data.identity_id, Some(identity_id.to_string()));
        assert_eq!(data.role.as_deref(), Some("identity"));
        assert_eq!(data.access_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_store_failure_is_service_unavailable() {
        let err = ApiError::from(IdentityError::DatabaseError("connection refused".to_string()));
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_signing_failure_hides_detail() {
        let err = ApiError::from(IdentityError::Token(auth::JwtError::EncodingFailed(
            "key material".to_string(),
        )));

        assert_eq!(
            err,
            ApiError::InternalServerError("Internal server error".to_string())
        );
    }
}
