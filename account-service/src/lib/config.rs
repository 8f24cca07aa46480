use std::env;

use auth::PasswordError;
use auth::PasswordHasher;
use auth::TokenLifetimes;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::auth::models::LockoutPolicy;
use crate::domain::auth::models::SessionPolicy;
use crate::domain::rate_limit::models::RatePolicy;
use crate::inbound::http::client::ForwardedFor;
use crate::inbound::http::router::LogRetention;
use crate::inbound::http::router::RateLimits;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub session: SessionConfig,
    pub lockout: LockoutConfig,
    pub rate_limit: RateLimitConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Take the client address from `X-Forwarded-For`. Enable only behind a
    /// proxy that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

/// Argon2id cost parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub activity_debounce_seconds: u64,
    pub cleanup_interval_minutes: u64,
    pub revoked_retention_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LockoutConfig {
    pub max_attempts: u32,
    pub lock_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub login: RateWindowConfig,
    pub register: RateWindowConfig,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RateWindowConfig {
    pub max_requests: u32,
    pub window_minutes: i64,
}

/// How long audit and rate limit rows are kept.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RetentionConfig {
    pub audit_log_days: i64,
    pub rate_limit_log_days: i64,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: LOCKOUT__MAX_ATTEMPTS=10 overrides lockout.max_attempts
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        configuration.try_deserialize()
    }
}

impl ServerConfig {
    pub fn forwarded_for(&self) -> ForwardedFor {
        ForwardedFor::from_trusted(self.trust_forwarded_for)
    }
}

impl JwtConfig {
    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes::new(
            Duration::minutes(self.access_token_minutes),
            Duration::days(self.refresh_token_days),
        )
    }
}

impl PasswordConfig {
    pub fn hasher(&self) -> Result<PasswordHasher, PasswordError> {
        PasswordHasher::with_params(self.memory_kib, self.iterations, self.parallelism)
    }
}

impl SessionConfig {
    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            ttl: Duration::hours(self.ttl_hours),
            activity_debounce: std::time::Duration::from_secs(self.activity_debounce_seconds),
            revoked_retention: Duration::days(self.revoked_retention_days),
        }
    }

    /// Period of the cleanup task, at least one minute.
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_minutes.max(1).saturating_mul(60))
    }
}

impl LockoutConfig {
    pub fn policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: self.max_attempts,
            lock_duration: Duration::minutes(self.lock_minutes),
        }
    }
}

impl RateWindowConfig {
    pub fn policy(&self) -> RatePolicy {
        RatePolicy::new(self.max_requests, Duration::minutes(self.window_minutes))
    }
}

impl RetentionConfig {
    /// Retention windows, each at least one day.
    pub fn policy(&self) -> LogRetention {
        LogRetention {
            audit_log: Duration::days(self.audit_log_days.max(1)),
            rate_limit_log: Duration::days(self.rate_limit_log_days.max(1)),
        }
    }
}

impl RateLimitConfig {
    pub fn limits(&self) -> RateLimits {
        RateLimits {
            login: self.login.policy(),
            register: self.register.policy(),
        }
    }
}
