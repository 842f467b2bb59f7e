use async_trait::async_trait;

use crate::domain::identity::models::AuthOutcome;
use crate::domain::identity::models::Credentials;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::LogoutOutcome;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::Password;
use crate::domain::identity::models::Username;
use crate::identity::errors::IdentityError;

/// Port for the authentication engine.
///
/// Every expected rejection (unknown username, role not held, wrong password,
/// missing or invalid token, duplicate username) is `Ok(AuthOutcome::Rejected)`.
/// `Err` is reserved for infrastructure faults.
#[async_trait]
pub trait IdentityServicePort: Send + Sync + 'static {
    /// Verify a credential pair and issue an access token.
    ///
    /// # Arguments
    /// * `credentials` - Username and plaintext password
    /// * `role` - Requested role, the configured default role when `None`
    ///
    /// # Returns
    /// Session with identifier, role and token, or `Rejected`
    ///
    /// # Errors
    /// * `DatabaseError` - Identity store unavailable
    /// * `Token` - Token signing failed
    async fn login(
        &self,
        credentials: Credentials,
        role: Option<String>,
    ) -> Result<AuthOutcome, IdentityError>;

    /// Register a new identity holding the default role and log it in.
    ///
    /// # Arguments
    /// * `credentials` - Username and plaintext password
    ///
    /// # Returns
    /// Session for the new identity, or `Rejected` when the username is taken or malformed
    ///
    /// # Errors
    /// * `Password` - Password hashing failed
    /// * `DatabaseError` - Identity store unavailable
    /// * `Token` - Token signing failed
    async fn create_identity(&self, credentials: Credentials)
        -> Result<AuthOutcome, IdentityError>;

    /// Replace the password of the identity a valid token was issued to.
    ///
    /// # Arguments
    /// * `access_token` - Token presented by the caller
    /// * `new_password` - Replacement plaintext password
    ///
    /// # Returns
    /// Fresh session for the default role, or `Rejected`
    ///
    /// # Errors
    /// * `Password` - Password hashing failed
    /// * `DatabaseError` - Identity store unavailable
    /// * `Token` - Token signing failed
    async fn change_credentials(
        &self,
        access_token: Option<String>,
        new_password: Password,
    ) -> Result<AuthOutcome, IdentityError>;

    /// End a session.
    ///
    /// Issued tokens cannot be revoked, so this always reports
    /// `is_logged_out: false` and the client discards its token.
    async fn logout(&self) -> LogoutOutcome;
}

/// Persistence operations for the identity aggregate.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Retrieve identity by username.
    ///
    /// # Returns
    /// Optional identity (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_username(&self, username: &Username)
        -> Result<Option<Identity>, IdentityError>;

    /// Persist a new identity.
    ///
    /// # Returns
    /// Identity as stored, including columns filled in by the store
    ///
    /// # Errors
    /// * `UsernameAlreadyExists` - Username is already taken
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, identity: NewIdentity) -> Result<Identity, IdentityError>;

    /// Replace the password hash of an identity.
    ///
    /// # Returns
    /// Updated identity (None if no identity has this username)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn update_password_hash(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Option<Identity>, IdentityError>;
}
