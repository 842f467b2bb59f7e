use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use auth::JwtHandler;
use auth::PasswordHasher;
use identity_service::domain::identity::models::Identity;
use identity_service::domain::identity::models::IdentityId;
use identity_service::domain::identity::models::NewIdentity;
use identity_service::domain::identity::models::PublicIdentity;
use identity_service::domain::identity::models::Role;
use identity_service::domain::identity::models::Username;
use identity_service::domain::identity::ports::IdentityRepository;
use identity_service::domain::identity::service::IdentityService;
use identity_service::identity::errors::IdentityError;
use identity_service::inbound::http::router::create_router;
use serde_json::json;
use tokio::sync::Mutex;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const JWT_ISSUER: &str = "identity-service";
pub const DEFAULT_ROLE: &str = "identity";
pub const BODY_LIMIT_BYTES: usize = 16 * 1024;

/// Identity store kept in process memory, keyed by username.
#[derive(Default)]
pub struct InMemoryIdentityRepository {
    identities: Mutex<HashMap<String, Identity>>,
    unavailable: AtomicBool,
}

impl InMemoryIdentityRepository {
    /// Make every subsequent call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn insert(&self, identity: Identity) {
        self.identities
            .lock()
            .await
            .insert(identity.username.as_str().to_string(), identity);
    }

    pub async fn password_hash(&self, username: &str) -> Option<String> {
        self.identities
            .lock()
            .await
            .get(username)
            .map(|identity| identity.password_hash.clone())
    }

    /// Identity as stored in the default `identities(id, username, password, roles)` table,
    /// plus any `extra` columns.
    pub fn stored(identity: NewIdentity, extra: serde_json::Value) -> Identity {
        let mut record = json!({
            "id": identity.id,
            "username": identity.username,
            "password": identity.password_hash,
            "roles": identity.roles,
        })
        .as_object()
        .cloned()
        .unwrap_or_default();
        if let serde_json::Value::Object(extra) = extra {
            record.extend(extra);
        }

        Identity {
            public: PublicIdentity::from_record(record, ["password", "secret"]),
            id: identity.id,
            username: identity.username,
            password_hash: identity.password_hash,
            roles: identity.roles,
        }
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(IdentityError::DatabaseError("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<Identity>, IdentityError> {
        self.check_available()?;
        Ok(self.identities.lock().await.get(username.as_str()).cloned())
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, IdentityError> {
        self.check_available()?;
        let mut identities = self.identities.lock().await;
        let key = identity.username.as_str().to_string();
        if identities.contains_key(&key) {
            return Err(IdentityError::UsernameAlreadyExists(key));
        }
        let identity = Self::stored(identity, json!({}));
        identities.insert(key, identity.clone());
        Ok(identity)
    }

    async fn update_password_hash(
        &self,
        username: &Username,
        password_hash: &str,
    ) -> Result<Option<Identity>, IdentityError> {
        self.check_available()?;
        let mut identities = self.identities.lock().await;
        Ok(identities.get_mut(username.as_str()).map(|identity| {
            identity.password_hash = password_hash.to_string();
            identity.clone()
        }))
    }
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub repository: Arc<InMemoryIdentityRepository>,
    pub api_client: reqwest::Client,
    pub jwt_handler: JwtHandler,
}

impl TestApp {
    /// Spawn the application with `tester`/`password` holding the `identity` role.
    ///
    /// The seeded row also carries a `display_name` column and a hidden `secret` column.
    pub async fn spawn() -> Self {
        let repository = Arc::new(InMemoryIdentityRepository::default());
        let password_hasher = PasswordHasher::with_cost(256, 1, 1).expect("Invalid test cost");

        let tester = NewIdentity {
            id: IdentityId::new(),
            username: Username::new("tester".to_string()).expect("Invalid username"),
            password_hash: password_hasher
                .hash("password")
                .expect("Failed to hash seed password"),
            roles: vec![Role::new(DEFAULT_ROLE.to_string()).expect("Invalid role")],
        };
        repository
            .insert(InMemoryIdentityRepository::stored(
                tester,
                json!({ "display_name": "Tester", "secret": "totp-seed" }),
            ))
            .await;

        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let jwt_handler = JwtHandler::new(JWT_SECRET, JWT_ISSUER);

        let identity_service = Arc::new(IdentityService::new(
            Arc::clone(&repository),
            Arc::new(password_hasher),
            Arc::new(jwt_handler.clone()),
            Role::new(DEFAULT_ROLE.to_string()).expect("Invalid role"),
        ));

        let router = create_router(identity_service, BODY_LIMIT_BYTES);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            repository,
            api_client: reqwest::Client::new(),
            jwt_handler,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Log in and return the response body
    pub async fn login(&self, username: &str, password: &str) -> serde_json::Value {
        self.post("/api/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Failed to parse response")
    }

    /// Log in and return the access token, panicking on rejection
    pub async fn access_token(&self, username: &str, password: &str) -> String {
        self.login(username, password).await["data"]["access_token"]
            .as_str()
            .expect("Login was rejected")
            .to_string()
    }
}
