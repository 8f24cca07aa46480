use std::net::SocketAddr;
use std::sync::Arc;

use account_service::domain::account::models::Role;
use account_service::domain::account::models::UserId;
use account_service::domain::account::service::AccountService;
use account_service::domain::audit::service::AuditService;
use account_service::domain::auth::models::LockoutPolicy;
use account_service::domain::auth::models::SessionPolicy;
use account_service::domain::auth::service::AuthService;
use account_service::domain::rate_limit::models::RatePolicy;
use account_service::domain::rate_limit::service::RateGuard;
use account_service::inbound::http::client::ForwardedFor;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::RateLimits;
use account_service::inbound::http::router::RouterSettings;
use account_service::outbound::repositories::in_memory::InMemoryAuditLog;
use account_service::outbound::repositories::in_memory::InMemoryCredentialStore;
use account_service::outbound::repositories::in_memory::InMemoryRateLimitLog;
use account_service::outbound::repositories::in_memory::InMemorySessionStore;
use auth::Authenticator;
use auth::PasswordHasher;
use auth::TokenCodec;
use serde_json::json;
use serde_json::Value;

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server backed by in-memory stores
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub sessions: Arc<InMemorySessionStore>,
    pub audit_log: Arc<InMemoryAuditLog>,
    pub rate_limit_log: Arc<InMemoryRateLimitLog>,
    pub codec: TokenCodec,
}

/// Tokens and ids returned by register and login.
pub struct Grant {
    pub user_id: i64,
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Grant {
    fn from_body(body: &Value) -> Self {
        Self {
            user_id: body["data"]["user"]["id"].as_i64().expect("user id"),
            session_id: body["data"]["session_id"]
                .as_str()
                .expect("session id")
                .to_string(),
            access_token: body["data"]["tokens"]["access_token"]
                .as_str()
                .expect("access token")
                .to_string(),
            refresh_token: body["data"]["tokens"]["refresh_token"]
                .as_str()
                .expect("refresh token")
                .to_string(),
        }
    }
}

impl TestApp {
    /// Spawn with rate limits high enough not to interfere with other checks
    pub async fn spawn() -> Self {
        let generous = RatePolicy::new(1_000, chrono::Duration::minutes(15));
        Self::spawn_with_limits(RateLimits {
            login: generous,
            register: generous,
        })
        .await
    }

    pub async fn spawn_with_limits(rate_limits: RateLimits) -> Self {
        Self::spawn_with_settings(RouterSettings {
            rate_limits,
            ..RouterSettings::default()
        })
        .await
    }

    /// Spawn as if deployed behind a proxy that sets `X-Forwarded-For`
    pub async fn spawn_behind_proxy(rate_limits: RateLimits) -> Self {
        Self::spawn_with_settings(RouterSettings {
            rate_limits,
            forwarded_for: ForwardedFor::Trust,
            ..RouterSettings::default()
        })
        .await
    }

    pub async fn spawn_with_settings(settings: RouterSettings) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let credentials = Arc::new(InMemoryCredentialStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let audit_log = Arc::new(InMemoryAuditLog::new());
        let rate_limit_log = Arc::new(InMemoryRateLimitLog::new());

        // Cheap Argon2 parameters keep the suite fast
        let hasher = PasswordHasher::with_params(1024, 1, 1).expect("valid argon2 params");
        let authenticator = Arc::new(Authenticator::from_parts(
            hasher.clone(),
            TokenCodec::new(TEST_SECRET),
        ));

        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&credentials),
            Arc::clone(&sessions),
            Arc::clone(&audit_log),
            authenticator,
            LockoutPolicy::default(),
            SessionPolicy::default(),
        ));
        let account_service = Arc::new(AccountService::new(
            Arc::clone(&credentials),
            Arc::clone(&sessions),
            Arc::clone(&audit_log),
            hasher,
            auth_service.activity(),
        ));
        let audit_service = Arc::new(AuditService::new(Arc::clone(&audit_log)));
        let rate_guard = Arc::new(RateGuard::new(Arc::clone(&rate_limit_log)));

        let router = create_router(
            auth_service,
            account_service,
            audit_service,
            rate_guard,
            settings,
        );

        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            credentials,
            sessions,
            audit_log,
            rate_limit_log,
            codec: TokenCodec::new(TEST_SECRET),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/auth{}", self.address, path)
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(self.url(path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(self.url(path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(self.url(path))
    }

    /// Helper to make DELETE request
    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(self.url(path))
    }

    /// Register `username` with password `password123` and return its first grant
    pub async fn register(&self, username: &str) -> Grant {
        let response = self
            .post("/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "password123",
                "full_name": format!("{} Example", username),
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.expect("Failed to parse response");
        Grant::from_body(&body)
    }

    pub async fn login(&self, identifier: &str, password: &str) -> reqwest::Response {
        self.post("/login")
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login_ok(&self, identifier: &str, password: &str) -> Grant {
        let response = self.login(identifier, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("Failed to parse response");
        Grant::from_body(&body)
    }

    /// Register a user, promote it to admin in the store and log in again
    pub async fn register_admin(&self, username: &str) -> Grant {
        let grant = self.register(username).await;
        assert!(self
            .credentials
            .modify(UserId(grant.user_id), |credential| credential.role = Role::Admin));
        // The role travels in the token, so a fresh login picks it up
        self.login_ok(username, "password123").await
    }
}
