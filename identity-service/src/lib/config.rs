use std::env;

use auth::JwtError;
use auth::JwtHandler;
use auth::PasswordError;
use auth::PasswordHasher;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::identity::models::ClaimNames;

/// Application configuration for identity-service.
///
/// Loaded from configuration files with environment variable overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub identity_table: IdentityTableConfig,
    pub identity: IdentityConfig,
    pub password: PasswordConfig,
    pub jwt: JwtConfig,
}

/// PostgreSQL database configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// HTTP server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub body_limit_bytes: usize,
}

/// Names of the identity relation and its columns.
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityTableConfig {
    pub table: String,
    pub id_column: String,
    pub username_column: String,
    pub password_column: String,
    pub roles_column: String,
    /// Columns never embedded in tokens, in addition to the password column
    pub hidden_columns: Vec<String>,
}

impl Default for IdentityTableConfig {
    fn default() -> Self {
        Self {
            table: "identities".to_string(),
            id_column: "id".to_string(),
            username_column: "username".to_string(),
            password_column: "password".to_string(),
            roles_column: "roles".to_string(),
            hidden_columns: vec!["password".to_string(), "secret".to_string()],
        }
    }
}

/// Identity defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Role assumed when a login names none, and granted to new identities
    pub default_role: String,
}

/// Argon2id cost parameters for new password hashes.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordConfig {
    /// Build the hashing adapter.
    ///
    /// # Errors
    /// * `InvalidParameters` - Cost parameters rejected by Argon2
    pub fn hasher(&self) -> Result<PasswordHasher, PasswordError> {
        PasswordHasher::with_cost(self.memory_kib, self.iterations, self.parallelism)
    }
}

/// JWT authentication configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub issuer: String,
    pub expiration_seconds: i64,
    pub clock_tolerance_seconds: u64,
    /// Claim holding the public identity
    pub identity_field: String,
    /// Claim holding the identity ID
    pub identity_id_field: String,
    /// Claim holding the authorized role
    pub role_field: String,
}

impl JwtConfig {
    const MIN_SECRET_LENGTH: usize = 32;
    const REGISTERED_CLAIMS: [&'static str; 4] = ["iss", "iat", "nbf", "exp"];

    /// Build the token codec.
    ///
    /// # Errors
    /// * `UnsupportedAlgorithm` - Algorithm is not one of HS256, HS384, HS512
    /// * `InvalidExpiration` - Token lifetime is not positive or out of range
    pub fn handler(&self) -> Result<JwtHandler, JwtError> {
        Ok(JwtHandler::new(self.secret.as_bytes(), self.issuer.clone())
            .with_algorithm(&self.algorithm)?
            .with_expiration_seconds(self.expiration_seconds)?
            .with_clock_tolerance(self.clock_tolerance_seconds))
    }

    fn claim_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("jwt.identity_field", self.identity_field.as_str()),
            ("jwt.identity_id_field", self.identity_id_field.as_str()),
            ("jwt.role_field", self.role_field.as_str()),
        ]
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides.
    ///
    /// # Configuration Priority (highest to lowest)
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    ///
    /// # Errors
    /// Returns error if required configuration values are missing or invalid
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: JWT__SECRET=... overrides jwt.secret
            // IDENTITY_TABLE__HIDDEN_COLUMNS is comma separated
            .add_source(
                Environment::with_prefix("")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("identity_table.hidden_columns")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < JwtConfig::MIN_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be at least {} bytes",
                JwtConfig::MIN_SECRET_LENGTH
            )));
        }

        if self.jwt.expiration_seconds <= 0 {
            return Err(ConfigError::Message(
                "jwt.expiration_seconds must be positive".to_string(),
            ));
        }

        if self.jwt.issuer.is_empty() {
            return Err(ConfigError::Message("jwt.issuer must not be empty".to_string()));
        }

        self.jwt
            .handler()
            .map_err(|e| ConfigError::Message(format!("jwt: {}", e)))?;

        let claim_fields = self.jwt.claim_fields();
        for (index, (key, name)) in claim_fields.iter().enumerate() {
            if name.is_empty() {
                return Err(ConfigError::Message(format!("{} must not be empty", key)));
            }
            if JwtConfig::REGISTERED_CLAIMS.iter().any(|claim| claim == name) {
                return Err(ConfigError::Message(format!(
                    "{} must not be a registered claim: {}",
                    key, name
                )));
            }
            if claim_fields[..index].iter().any(|(_, other)| other == name) {
                return Err(ConfigError::Message(format!(
                    "{} duplicates another claim name: {}",
                    key, name
                )));
            }
        }

        self.password
            .hasher()
            .map_err(|e| ConfigError::Message(format!("password: {}", e)))?;

        if self.identity.default_role.is_empty() {
            return Err(ConfigError::Message(
                "identity.default_role must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Claim names for signed tokens; the username is read under its column name.
    pub fn claim_names(&self) -> ClaimNames {
        ClaimNames {
            identity: self.jwt.identity_field.clone(),
            identity_id: self.jwt.identity_id_field.clone(),
            role: self.jwt.role_field.clone(),
            username: self.identity_table.username_column.clone(),
        }
    }
}
