//! Authentication utilities library
//!
//! Provides the credential primitives used by the identity gateway:
//! - Password hashing (Argon2id, configurable cost)
//! - Signed, time-bounded access tokens (JWT, HMAC family)
//!
//! Services define their own token payloads and persistence; this crate only
//! knows how to hash secrets and how to sign and verify claims.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::with_cost(256, 1, 1).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## JWT Tokens
//! ```
//! use auth::JwtHandler;
//! use serde::Deserialize;
//! use serde::Serialize;
//!
//! #[derive(Serialize, Deserialize)]
//! struct RoleClaims {
//!     role: String,
//! }
//!
//! let handler = JwtHandler::new(b"secret_key_at_least_32_bytes_long!", "my-service");
//! let issued = handler.sign(&RoleClaims { role: "admin".to_string() }).unwrap();
//! let decoded: RoleClaims = handler.verify(&issued.access_token).unwrap();
//! assert_eq!(decoded.role, "admin");
//! ```

pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use jwt::IssuedToken;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use jwt::TokenEnvelope;
pub use password::PasswordError;
pub use password::PasswordHasher;
