use serde::Deserialize;
use serde::Serialize;

/// Registered claims wrapped around a service-defined payload.
///
/// The payload is flattened into the token next to `iss`, `iat`, `nbf` and
/// `exp`, so a token signed with payload `{"role": "admin"}` decodes as
/// `{"iss": ..., "iat": ..., "nbf": ..., "exp": ..., "role": "admin"}`.
/// Payload types must not define fields with the registered names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenEnvelope<T> {
    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp), always equal to `iat`
    pub nbf: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Service claims
    #[serde(flatten)]
    pub claims: T,
}

impl<T> TokenEnvelope<T> {
    /// Wrap claims issued at `issued_at` and valid for `lifetime_seconds`.
    pub fn new(claims: T, issuer: String, issued_at: i64, lifetime_seconds: i64) -> Self {
        Self {
            iss: issuer,
            iat: issued_at,
            nbf: issued_at,
            exp: issued_at + lifetime_seconds,
            claims,
        }
    }

    /// Unwrap the service claims.
    pub fn into_claims(self) -> T {
        self.claims
    }
}
