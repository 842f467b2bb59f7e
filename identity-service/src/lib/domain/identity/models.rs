use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::identity::errors::RoleError;
use crate::identity::errors::UsernameError;

/// Identity aggregate entity.
///
/// A stored principal. The password hash never leaves the domain: anything
/// serialized goes through [`PublicIdentity`].
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: IdentityId,
    pub username: Username,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub public: PublicIdentity,
}

impl Identity {
    /// Check role membership.
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|held| held == role)
    }
}

/// Identity to be inserted by registration.
///
/// The store assigns nothing but returns the full record as an [`Identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub id: IdentityId,
    pub username: Username,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Identity unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Generate a new random identity ID.
    ///
    /// # Returns
    /// IdentityId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Any non-empty string; the store decides what else is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a new valid username.
    ///
    /// # Errors
    /// * `Empty` - Username is empty
    pub fn new(username: String) -> Result<Self, UsernameError> {
        if username.is_empty() {
            return Err(UsernameError::Empty);
        }

        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role name value type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// Create a new role name.
    ///
    /// # Errors
    /// * `Empty` - Role name is empty
    pub fn new(role: String) -> Result<Self, RoleError> {
        if role.is_empty() {
            return Err(RoleError::Empty);
        }

        Ok(Self(role))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Role {
    type Error = RoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Plaintext password.
///
/// Only exists for the duration of a request. `Debug` is redacted so it
/// cannot end up in logs.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Raw credential pair as received from a caller.
///
/// The username is parsed by the service so that a malformed username is
/// rejected exactly like an unknown one.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password: Password::new(password),
        }
    }
}

/// Identity as it appears outside the store.
///
/// The stored record keyed by column name, with the password column and every
/// hidden column removed. Columns the domain knows nothing about are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicIdentity(Map<String, Value>);

impl PublicIdentity {
    /// Strip `hidden` columns from a stored record.
    pub fn from_record<'a>(
        mut record: Map<String, Value>,
        hidden: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        for column in hidden {
            record.remove(column);
        }
        Self(record)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }
}

/// Names under which an access token carries its claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimNames {
    /// Claim holding the public identity
    pub identity: String,
    /// Claim holding the identity ID
    pub identity_id: String,
    /// Claim holding the authorized role
    pub role: String,
    /// Attribute of the public identity holding the username
    pub username: String,
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            identity: "identity".to_string(),
            identity_id: "identity_id".to_string(),
            role: "identity_role".to_string(),
            username: "username".to_string(),
        }
    }
}

/// Payload signed into every access token.
///
/// Embeds the whole public identity so that consumers need no session lookup;
/// the embedded data is only as fresh as the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessTokenClaims(Map<String, Value>);

impl AccessTokenClaims {
    pub fn new(names: &ClaimNames, identity: &Identity, role: &Role) -> Self {
        let mut claims = Map::new();
        claims.insert(
            names.identity.clone(),
            Value::Object(identity.public.0.clone()),
        );
        claims.insert(
            names.identity_id.clone(),
            Value::String(identity.id.to_string()),
        );
        claims.insert(names.role.clone(), Value::String(role.as_str().to_string()));
        Self(claims)
    }

    /// Username of the embedded identity, if the claims carry one.
    pub fn username(&self, names: &ClaimNames) -> Option<&str> {
        self.0
            .get(&names.identity)?
            .get(&names.username)?
            .as_str()
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }
}

/// Successfully authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity_id: IdentityId,
    pub role: Role,
    pub access_token: String,
}

/// Result of login, registration and credential rotation.
///
/// `Rejected` deliberately carries no reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Session),
    Rejected,
}

/// Result of a logout request.
///
/// Tokens are stateless, so nothing is ever revoked server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub is_logged_out: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn identity() -> Identity {
        let id = IdentityId::new();
        let record = json!({
            "id": id,
            "username": "tester",
            "password": "$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA",
            "secret": "totp-seed",
            "roles": ["identity", "admin"],
            "display_name": "Tester",
        });

        Identity {
            id,
            username: Username::new("tester".to_string()).unwrap(),
            password_hash: "$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA".to_string(),
            roles: vec![
                Role::new("identity".to_string()).unwrap(),
                Role::new("admin".to_string()).unwrap(),
            ],
            public: PublicIdentity::from_record(
                record.as_object().unwrap().clone(),
                ["password", "secret"],
            ),
        }
    }

    #[test]
    fn test_username_validation() {
        assert!(Username::new("tester".to_string()).is_ok());
        assert!(Username::new("john doe".to_string()).is_ok());
        assert!(Username::new("jane.doe@example.com".to_string()).is_ok());
        assert!(Username::new("a".repeat(1024)).is_ok());

        assert_eq!(Username::new(String::new()), Err(UsernameError::Empty));
    }

    #[test]
    fn test_role_validation() {
        assert!(Role::new("identity".to_string()).is_ok());
        assert!(Role::new("r".repeat(128)).is_ok());
        assert_eq!(Role::new(String::new()), Err(RoleError::Empty));
    }

    #[test]
    fn test_has_role() {
        let identity = identity();

        assert!(identity.has_role(&Role::new("admin".to_string()).unwrap()));
        assert!(!identity.has_role(&Role::new("nonexistent-role".to_string()).unwrap()));
    }

    #[test]
    fn test_public_identity_strips_hidden_columns() {
        let public = identity().public;

        assert!(public.get("password").is_none());
        assert!(public.get("secret").is_none());
        assert_eq!(public.get("display_name"), Some(&json!("Tester")));
        assert_eq!(public.get("username"), Some(&json!("tester")));
    }

    #[test]
    fn test_claims_never_contain_password_hash() {
        let identity = identity();
        let claims = AccessTokenClaims::new(
            &ClaimNames::default(),
            &identity,
            &Role::new("identity".to_string()).unwrap(),
        );

        let value = serde_json::to_value(&claims).unwrap();
        let serialized = value.to_string();

        assert_eq!(value["identity"]["username"], "tester");
        assert_eq!(value["identity"]["display_name"], "Tester");
        assert_eq!(value["identity_id"], identity.id.to_string());
        assert_eq!(value["identity_role"], "identity");
        assert!(!serialized.contains(&identity.password_hash));
        assert!(!serialized.contains("totp-seed"));
    }

    #[test]
    fn test_claims_use_configured_names() {
        let names = ClaimNames {
            identity: "user".to_string(),
            identity_id: "sub".to_string(),
            role: "role".to_string(),
            username: "username".to_string(),
        };
        let identity = identity();
        let claims = AccessTokenClaims::new(
            &names,
            &identity,
            &Role::new("admin".to_string()).unwrap(),
        );

        assert_eq!(claims.get("sub"), Some(&json!(identity.id.to_string())));
        assert_eq!(claims.get("role"), Some(&json!("admin")));
        assert!(claims.get("identity").is_none());
        assert_eq!(claims.username(&names), Some("tester"));
        assert_eq!(claims.username(&ClaimNames::default()), None);
    }

    #[test]
    fn test_claims_username_requires_string() {
        let claims: AccessTokenClaims = serde_json::from_value(json!({
            "identity": { "username": 42 },
            "identity_id": IdentityId::new(),
            "identity_role": "identity",
        }))
        .unwrap();

        assert_eq!(claims.username(&ClaimNames::default()), None);
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let credentials = Credentials::new("tester".to_string(), "hunter2".to_string());
        let debug = format!("{:?}", credentials);

        assert!(debug.contains("tester"));
        assert!(!debug.contains("hunter2"));
    }
}
