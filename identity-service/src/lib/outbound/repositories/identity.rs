use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::IdentityTableConfig;
use crate::domain::identity::models::Identity;
use crate::domain::identity::models::IdentityId;
use crate::domain::identity::models::NewIdentity;
use crate::domain::identity::models::PublicIdentity;
use crate::domain::identity::models::Role;
use crate::domain::identity::models::Username;
use crate::domain::identity::ports::IdentityRepository;
use crate::identity::errors::IdentityError;

/// Error for identity table configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityTableError {
    #[error("Invalid SQL identifier for {field}: {name:?}")]
    InvalidIdentifier { field: &'static str, name: String },
}

/// Queries against a configurable identity relation.
///
/// Table and column names come from configuration, so every name is checked
/// to be a plain identifier and then quoted before it reaches SQL. Rows come
/// back whole as JSON so that columns beyond the four known ones end up in
/// the public identity.
#[derive(Debug, Clone)]
pub struct IdentityTable {
    id_column: String,
    username_column: String,
    password_column: String,
    roles_column: String,
    hidden_columns: Vec<String>,
    find_by_username: String,
    insert: String,
    update_password: String,
}

impl IdentityTable {
    const MAX_IDENTIFIER_LENGTH: usize = 63;
    const ROW_ALIAS: &'static str = "\"identity_row\"";

    /// Build the queries for the configured relation.
    ///
    /// # Errors
    /// * `InvalidIdentifier` - A table or column name is not a plain SQL identifier
    pub fn new(config: &IdentityTableConfig) -> Result<Self, IdentityTableError> {
        let table = Self::quote_path("table", &config.table)?;
        let id = Self::quote("id_column", &config.id_column)?;
        let username = Self::quote("username_column", &config.username_column)?;
        let password = Self::quote("password_column", &config.password_column)?;
        let roles = Self::quote("roles_column", &config.roles_column)?;

        let columns = format!("{id}, {username}, {password}, {roles}");
        let record = format!("to_jsonb({}.*)", Self::ROW_ALIAS);
        let alias = Self::ROW_ALIAS;

        Ok(Self {
            id_column: config.id_column.clone(),
            username_column: config.username_column.clone(),
            password_column: config.password_column.clone(),
            roles_column: config.roles_column.clone(),
            hidden_columns: config.hidden_columns.clone(),
            find_by_username: format!(
                "SELECT {record} FROM {table} AS {alias} WHERE {username} = $1 LIMIT 1"
            ),
            insert: format!(
                "INSERT INTO {table} AS {alias} ({columns}) VALUES ($1, $2, $3, $4) RETURNING {record}"
            ),
            update_password: format!(
                "UPDATE {table} AS {alias} SET {password} = $1 WHERE {username} = $2 RETURNING {record}"
            ),
        })
    }

    fn is_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        let starts_well = chars
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');

        starts_well
            && name.len() <= Self::MAX_IDENTIFIER_LENGTH
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn quote(field: &'static str, name: &str) -> Result<String, IdentityTableError> {
        if Self::is_identifier(name) {
            Ok(format!("\"{}\"", name))
        } else {
            Err(IdentityTableError::InvalidIdentifier {
                field,
                name: name.to_string(),
            })
        }
    }

    /// Quote `table` or `schema.table`.
    fn quote_path(field: &'static str, path: &str) -> Result<String, IdentityTableError> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.len() > 2 {
            return Err(IdentityTableError::InvalidIdentifier {
                field,
                name: path.to_string(),
            });
        }

        parts
            .iter()
            .map(|part| {
                Self::quote(field, part).map_err(|_| IdentityTableError::InvalidIdentifier {
                    field,
                    name: path.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|quoted| quoted.join("."))
    }

    fn identity_from_row(&self, row: &PgRow) -> Result<Identity, IdentityError> {
        let record: Value = row
            .try_get(0)
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        self.identity_from_record(record)
    }

    /// Map a stored record, keyed by column name, to an identity.
    ///
    /// Roles that are not valid role names are skipped rather than failing
    /// the whole row.
    fn identity_from_record(&self, record: Value) -> Result<Identity, IdentityError> {
        let Value::Object(record) = record else {
            return Err(IdentityError::DatabaseError(
                "identity row is not a record".to_string(),
            ));
        };

        let id = Self::text_column(&record, &self.id_column)?;
        let id = Uuid::parse_str(id).map_err(|e| {
            IdentityError::DatabaseError(format!("column {:?}: {}", self.id_column, e))
        })?;
        let username =
            Username::new(Self::text_column(&record, &self.username_column)?.to_string())?;
        let password_hash = Self::text_column(&record, &self.password_column)?.to_string();

        let roles = match record.get(&self.roles_column) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|value| {
                    let role = value.as_str().and_then(|name| Role::new(name.to_string()).ok());
                    if role.is_none() {
                        warn!(%username, role = %value, "Skipping invalid stored role");
                    }
                    role
                })
                .collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(IdentityError::DatabaseError(format!(
                    "column {:?} is not an array",
                    self.roles_column
                )))
            }
        };

        let hidden = self
            .hidden_columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.password_column.as_str()));

        Ok(Identity {
            id: IdentityId(id),
            username,
            password_hash,
            roles,
            public: PublicIdentity::from_record(record, hidden),
        })
    }

    fn text_column<'a>(
        record: &'a Map<String, Value>,
        column: &str,
    ) -> Result<&'a str, IdentityError> {
        record.get(column).and_then(Value::as_str).ok_or_else(|| {
            IdentityError::DatabaseError(format!("column {:?} is not text", column))
        })
    }
}

pub struct PostgresIdentityRepository {
    pool: PgPool,
    table: IdentityTable,
}

impl PostgresIdentityRepository {
    /// Create a new PostgreSQL identity repository.
    ///
    /// # Arguments
    /// * `pool` - PostgreSQL connection pool
    /// * `table` - Queries for the configured identity relation
    pub fn new(pool: PgPool, table: IdentityTable) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Identity>, IdentityError> {
        let row = sqlx::query(&self.table.find_by_username)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        row.map(|r| self.table.identity_from_row(&r)).transpose()
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, IdentityError> {
        let roles: Vec<String> = identity
            .roles
            .iter()
            .map(|role| role.as_str().to_string())
            .collect();

        let row = sqlx::query(&self.table.insert)
            .bind(identity.id.0)
            .bind(identity.username.as_str())
            .bind(&identity.password_hash)
            .bind(roles)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return IdentityError::UsernameAlreadyExists(
                            identity.username.as_str().to_string(),
                        );
                    }
                }
                IdentityError::DatabaseError(e.to_string())
            })?;

        self.table.identity_from_row(&row)
    }

    async fn update_password_hash(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        let row = sqlx::query(&self.table.update_password)
            .bind(password_hash)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IdentityError::DatabaseError(e.to_string()))?;

        row.map(|r| self.table.identity_from_row(&r)).transpose()
    }
}
