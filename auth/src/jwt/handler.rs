use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::claims::TokenEnvelope;
use super::errors::JwtError;

/// Default token lifetime.
pub const DEFAULT_EXPIRATION_SECONDS: i64 = 24 * 60 * 60;

/// Default allowed clock skew when validating `exp` and `nbf`.
pub const DEFAULT_CLOCK_TOLERANCE_SECONDS: u64 = 5;

/// A freshly signed token with the metadata worth logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Compact JWT
    pub access_token: String,

    /// Unique `kid` placed in the token header
    pub key_id: String,

    /// Expiration time (Unix timestamp)
    pub expires_at: i64,
}

/// JWT token handler for signing and verifying tokens.
///
/// Generic over the claims type to allow services to define their own token payload.
/// Every token is wrapped in a [`TokenEnvelope`] carrying issuer and validity window,
/// and gets a fresh `kid`. Only the shared-secret HMAC family is supported.
#[derive(Clone)]
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    expiration: Duration,
    clock_tolerance: u64,
}

impl JwtHandler {
    /// Create a new JWT handler with a secret key and issuer.
    ///
    /// # Arguments
    /// * `secret` - Secret key for signing tokens (should be stored securely)
    /// * `issuer` - Value written to and required in the `iss` claim
    ///
    /// # Returns
    /// JwtHandler configured with HS256, a 24 hour lifetime and 5 seconds of clock tolerance
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
            expiration: Duration::seconds(DEFAULT_EXPIRATION_SECONDS),
            clock_tolerance: DEFAULT_CLOCK_TOLERANCE_SECONDS,
        }
    }

    /// Set the signing algorithm by name (`HS256`, `HS384` or `HS512`).
    ///
    /// # Errors
    /// * `UnsupportedAlgorithm` - Unknown name, or an algorithm that needs a key pair
    pub fn with_algorithm(mut self, name: &str) -> Result<Self, JwtError> {
        self.algorithm = parse_algorithm(name)?;
        Ok(self)
    }

    /// Set the lifetime of issued tokens, in seconds.
    ///
    /// # Errors
    /// * `InvalidExpiration` - Not positive, or too large to represent
    pub fn with_expiration_seconds(mut self, seconds: i64) -> Result<Self, JwtError> {
        self.expiration = Duration::try_seconds(seconds)
            .filter(|expiration| *expiration > Duration::zero())
            .ok_or(JwtError::InvalidExpiration(seconds))?;
        Ok(self)
    }

    /// Set the clock tolerance, in seconds, applied to both ends of the validity window.
    pub fn with_clock_tolerance(mut self, seconds: u64) -> Self {
        self.clock_tolerance = seconds;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign claims issued now.
    ///
    /// # Arguments
    /// * `claims` - Claims to encode (must implement Serialize)
    ///
    /// # Returns
    /// Issued token with its key id and expiration
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<IssuedToken, JwtError> {
        self.sign_at(claims, Utc::now())
    }

    /// Sign claims as if issued at `issued_at`.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn sign_at<T: Serialize>(
        &self,
        claims: &T,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, JwtError> {
        let envelope = TokenEnvelope::new(
            claims,
            self.issuer.clone(),
            issued_at.timestamp(),
            self.expiration.num_seconds(),
        );

        let key_id = Uuid::new_v4().to_string();
        let mut header = Header::new(self.algorithm);
        header.kid = Some(key_id.clone());

        let access_token = encode(&header, &envelope, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            key_id,
            expires_at: envelope.exp,
        })
    }

    /// Verify a token and return its service claims unchanged.
    ///
    /// # Errors
    /// * `TokenExpired` - `exp` is further in the past than the clock tolerance
    /// * `InvalidToken` - Bad signature, wrong algorithm, wrong issuer or not yet valid
    /// * `DecodingFailed` - Token is malformed or claims do not match `T`
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        self.verify_envelope(token).map(TokenEnvelope::into_claims)
    }

    /// Verify a token and return the full envelope.
    ///
    /// # Errors
    /// Same as [`JwtHandler::verify`]
    pub fn verify_envelope<T: DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<TokenEnvelope<T>, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.clock_tolerance;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss"]);

        let token_data = decode::<TokenEnvelope<T>>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidIssuer
                | ErrorKind::ImmatureSignature => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::DecodingFailed(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}

fn parse_algorithm(name: &str) -> Result<Algorithm, JwtError> {
    let algorithm: Algorithm = name
        .parse()
        .map_err(|_| JwtError::UnsupportedAlgorithm(name.to_string()))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        _ => Err(JwtError::UnsupportedAlgorithm(name.to_string())),
    }
}
