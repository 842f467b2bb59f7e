use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::identity::models::AccessTokenClaims;
use crate::domain::identity::models::AuthOutcome;
use crate::domain::identity::models::ClaimNames;
use crate::domain::identity::models::Credentials;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::LogoutOutcome;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::Password;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::Session;
use crate::domain::identity::models::Username;
use crate::identity::errors::IdentityError;
use crate::identity::ports::IdentityRepository;
use crate::identity::ports::IdentityServicePort;

/// Why a request was rejected. Logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectReason {
    MalformedUsername,
    UnknownIdentity,
    RoleNotAllowed,
    InvalidPassword,
    UnreadableHash,
    DuplicateUsername,
    MissingToken,
    InvalidToken,
}

impl RejectReason {
    fn as_str(self) -> &'static str {
        match self {
            RejectReason::MalformedUsername => "malformed_username",
            RejectReason::UnknownIdentity => "unknown_identity",
            RejectReason::RoleNotAllowed => "role_not_allowed",
            RejectReason::InvalidPassword => "invalid_password",
            RejectReason::UnreadableHash => "unreadable_hash",
            RejectReason::DuplicateUsername => "duplicate_username",
            RejectReason::MissingToken => "missing_token",
            RejectReason::InvalidToken => "invalid_token",
        }
    }
}

fn reject(reason: RejectReason, username: &str) -> AuthOutcome {
    tracing::warn!(
        reason = reason.as_str(),
        username = username,
        "Authentication request rejected"
    );
    AuthOutcome::Rejected
}

/// Authentication engine.
///
/// Holds only process-wide, read-only collaborators handed in by the process
/// root. Password hashing runs on the blocking pool.
pub struct IdentityService<IR>
where
    IR: IdentityRepository,
{
    repository: Arc<IR>,
    password_hasher: Arc<auth::PasswordHasher>,
    jwt_handler: Arc<auth::JwtHandler>,
    default_role: Role,
    claim_names: ClaimNames,
}

impl<IR> IdentityService<IR>
where
    IR: IdentityRepository,
{
    /// Create a new identity service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Identity persistence implementation
    /// * `password_hasher` - Hashing adapter used for new and rotated passwords
    /// * `jwt_handler` - Token codec used to sign and verify access tokens
    /// * `default_role` - Role used when a login names none, and granted on registration
    pub fn new(
        repository: Arc<IR>,
        password_hasher: Arc<auth::PasswordHasher>,
        jwt_handler: Arc<auth::JwtHandler>,
        default_role: Role,
    ) -> Self {
        Self {
            repository,
            password_hasher,
            jwt_handler,
            default_role,
            claim_names: ClaimNames::default(),
        }
    }

    /// Lay out access tokens under the given claim names.
    pub fn with_claim_names(mut self, claim_names: ClaimNames) -> Self {
        self.claim_names = claim_names;
        self
    }

    async fn hash_password(&self, password: &Password) -> Result<String, IdentityError> {
        let hasher = Arc::clone(&self.password_hasher);
        let password = password.clone();

        tokio::task::spawn_blocking(move || hasher.hash(password.expose()))
            .await
            .map_err(|e| IdentityError::Unknown(format!("Password hashing task failed: {}", e)))?
            .map_err(IdentityError::from)
    }

    async fn verify_password(
        &self,
        password: &Password,
        password_hash: &str,
    ) -> Result<bool, IdentityError> {
        let hasher = Arc::clone(&self.password_hasher);
        let password = password.clone();
        let password_hash = password_hash.to_string();

        tokio::task::spawn_blocking(move || hasher.verify(password.expose(), &password_hash))
            .await
            .map_err(|e| {
                IdentityError::Unknown(format!("Password verification task failed: {}", e))
            })?
            .map_err(IdentityError::from)
    }

    fn issue_session(&self, identity: &Identity, role: Role) -> Result<AuthOutcome, IdentityError> {
        let claims = AccessTokenClaims::new(&self.claim_names, identity, &role);
        let issued = self.jwt_handler.sign(&claims)?;

        tracing::info!(
            identity_id = %identity.id,
            username = %identity.username,
            role = %role,
            key_id = %issued.key_id,
            expires_at = issued.expires_at,
            "Access token issued"
        );

        Ok(AuthOutcome::Authenticated(Session {
            identity_id: identity.id,
            role,
            access_token: issued.access_token,
        }))
    }
}

#[async_trait]
impl<IR> IdentityServicePort for IdentityService<IR>
where
    IR: IdentityRepository,
{
    async fn login(
        &self,
        credentials: Credentials,
        role: Option<String>,
    ) -> Result<AuthOutcome, IdentityError> {
        let username = match Username::new(credentials.username) {
            Ok(username) => username,
            Err(e) => {
                tracing::debug!(error = %e, "Username failed validation");
                return Ok(reject(RejectReason::MalformedUsername, "<malformed>"));
            }
        };

        // Lookup, role check and password check short-circuit in this order.
        let Some(identity) = self.repository.find_by_username(&username).await? else {
            return Ok(reject(RejectReason::UnknownIdentity, username.as_str()));
        };

        let role = match role {
            Some(requested) => match Role::new(requested) {
                Ok(role) => role,
                Err(_) => return Ok(reject(RejectReason::RoleNotAllowed, username.as_str())),
            },
            None => self.default_role.clone(),
        };

        if !identity.has_role(&role) {
            return Ok(reject(RejectReason::RoleNotAllowed, username.as_str()));
        }

        match self
            .verify_password(&credentials.password, &identity.password_hash)
            .await
        {
            Ok(true) => {}
            Ok(false) => return Ok(reject(RejectReason::InvalidPassword, username.as_str())),
            Err(IdentityError::Password(e)) => {
                tracing::error!(
                    identity_id = %identity.id,
                    error = %e,
                    "Stored password hash could not be read"
                );
                return Ok(reject(RejectReason::UnreadableHash, username.as_str()));
            }
            Err(e) => return Err(e),
        }

        tracing::info!(username = %username, role = %role, "Login verified");

        self.issue_session(&identity, role)
    }

    async fn create_identity(
        &self,
        credentials: Credentials,
    ) -> Result<AuthOutcome, IdentityError> {
        let username = match Username::new(credentials.username) {
            Ok(username) => username,
            Err(e) => {
                tracing::debug!(error = %e, "Username failed validation");
                return Ok(reject(RejectReason::MalformedUsername, "<malformed>"));
            }
        };

        let password_hash = self.hash_password(&credentials.password).await?;

        let identity = NewIdentity {
            id: IdentityId::new(),
            username: username.clone(),
            password_hash,
            roles: vec![self.default_role.clone()],
        };

        match self.repository.create(identity).await {
            Ok(created) => {
                tracing::info!(
                    identity_id = %created.id,
                    username = %created.username,
                    "Identity created"
                );
            }
            Err(IdentityError::UsernameAlreadyExists(_)) => {
                return Ok(reject(RejectReason::DuplicateUsername, username.as_str()));
            }
            Err(e) => return Err(e),
        }

        // Registration always hands back a usable session.
        let credentials = Credentials {
            username: username.into_string(),
            password: credentials.password,
        };
        self.login(credentials, None).await
    }

    async fn change_credentials(
        &self,
        access_token: Option<String>,
        new_password: Password,
    ) -> Result<AuthOutcome, IdentityError> {
        let Some(access_token) = access_token.filter(|token| !token.is_empty()) else {
            return Ok(reject(RejectReason::MissingToken, "<anonymous>"));
        };

        let claims: AccessTokenClaims = match self.jwt_handler.verify(&access_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Presented token failed verification");
                return Ok(reject(RejectReason::InvalidToken, "<anonymous>"));
            }
        };

        let Some(username) = claims.username(&self.claim_names) else {
            return Ok(reject(RejectReason::InvalidToken, "<anonymous>"));
        };
        let username = match Username::new(username.to_string()) {
            Ok(username) => username,
            Err(_) => return Ok(reject(RejectReason::MalformedUsername, "<malformed>")),
        };
        let password_hash = self.hash_password(&new_password).await?;

        match self
            .repository
            .update_password_hash(&username, &password_hash)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    identity_id = %updated.id,
                    username = %updated.username,
                    "Credentials updated"
                );
            }
            None => return Ok(reject(RejectReason::UnknownIdentity, username.as_str())),
        }

        // The role carried by the presented token is not reused.
        let credentials = Credentials {
            username: username.into_string(),
            password: new_password,
        };
        self.login(credentials, None).await
    }

    async fn logout(&self) -> LogoutOutcome {
        tracing::debug!("Logout requested; tokens remain valid until expiry");
        LogoutOutcome {
            is_logged_out: false,
        }
    }
}
