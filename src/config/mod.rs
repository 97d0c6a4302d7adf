use chrono::Duration;
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret. A random per-process key is generated when unset.
    pub jwt_secret: Option<String>,
    pub token_expiry_secs: i64,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn token_lifetime(&self) -> Result<Duration, ConfigError> {
        if self.token_expiry_secs <= 0 {
            return Err(ConfigError::Message(
                "auth.token_expiry_secs must be positive".into(),
            ));
        }
        Duration::try_seconds(self.token_expiry_secs).ok_or_else(|| {
            ConfigError::Message("auth.token_expiry_secs is out of range".into())
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_attempts: u32,
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 300,      // 5 minutes
            max_attempts: 5,
            sweep_interval_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Result<Duration, ConfigError> {
        if self.window_secs == 0 {
            return Err(ConfigError::Message("rate_limit.window_secs must be positive".into()));
        }
        i64::try_from(self.window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| ConfigError::Message("rate_limit.window_secs is out of range".into()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    pub activity_log: String,
    pub error_log: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    pub max_age: u32,
}

/// Account provisioned at startup when missing.
#[derive(Debug, Deserialize, Clone)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub audit: AuditConfig,
    pub cors: CorsConfig,
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Self::defaults()?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_RATE_LIMIT__MAX_ATTEMPTS=10` would set `Settings.rate_limit.max_attempts`
            .add_source(app_environment())
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Deterministic settings for tests: in-memory database, fixed secret,
    /// cheap bcrypt cost. Does not read the process environment.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::test_defaults()?
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Rejects values that deserialize fine but would break the services
    /// built from them.
    fn validated(self) -> Result<Self, ConfigError> {
        self.auth.token_lifetime()?;
        self.rate_limit.window()?;
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::Message("rate_limit.max_attempts must be at least 1".into()));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Message("auth.bcrypt_cost must be between 4 and 31".into()));
        }
        Ok(self)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.url", "sqlite://feed.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.token_expiry_secs", 3600)?
            .set_default("auth.bcrypt_cost", bcrypt::DEFAULT_COST as i64)?
            .set_default("rate_limit.window_secs", 300)?
            .set_default("rate_limit.max_attempts", 5)?
            .set_default("rate_limit.sweep_interval_secs", 60)?
            .set_default("audit.activity_log", "user-activity_logs.txt")?
            .set_default("audit.error_log", "server_logs.txt")?
            .set_default("cors.enabled", false)?
            .set_default("cors.max_age", 3600)
    }

    fn test_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Self::defaults()?
            .set_default("environment", "test")?
            .set_default("server.workers", 1)?
            .set_default("database.url", "sqlite::memory:")?
            .set_default("database.max_connections", 1)?
            .set_default("auth.jwt_secret", "test_secret")?
            .set_default("auth.bcrypt_cost", 4)
    }
}

fn app_environment() -> Environment {
    Environment::with_prefix("app")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
