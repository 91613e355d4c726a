// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration management for production deployment

use crate::constants::{credential_lengths, defaults, store, token_lifetimes};
use crate::errors::{AppError, AppResult};
use crate::utils::random::generate_random_string;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Standard operational logging
    #[default]
    Info,
    /// Verbose diagnostics
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Convert to `tracing::Level`
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Error => tracing::Level::ERROR,
            Self::Warn => tracing::Level::WARN,
            Self::Info => tracing::Level::INFO,
            Self::Debug => tracing::Level::DEBUG,
            Self::Trace => tracing::Level::TRACE,
        }
    }

    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Token store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Process-local LRU store
    #[default]
    Memory,
    /// Shared Redis store
    Redis,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::config(format!(
                "Invalid STORE_BACKEND '{other}' (expected 'memory' or 'redis')"
            ))),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Log level
    pub log_level: LogLevel,
    /// JWT and password settings
    pub auth: AuthConfig,
    /// The single registered OAuth client
    pub oauth_client: OAuthClientConfig,
    /// Google federated login
    pub google: GoogleConfig,
    /// Token/code/state store
    pub store: StoreConfig,
    /// Credential store
    pub database: DatabaseConfig,
    /// Cross-origin settings
    pub cors: CorsConfig,
}

/// JWT signing and password hashing configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret shared by primary and OAuth access tokens
    pub jwt_secret: String,
    /// Primary access token lifetime in seconds
    pub jwt_expiration_secs: i64,
    /// OAuth access token (and stored record) lifetime in seconds
    pub oauth_access_token_ttl_secs: i64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Configuration with default lifetimes and the given secret
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_expiration_secs: token_lifetimes::DEFAULT_ACCESS_TOKEN_SECS,
            oauth_access_token_ttl_secs: token_lifetimes::DEFAULT_ACCESS_TOKEN_SECS,
            bcrypt_cost: defaults::BCRYPT_COST,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field(
                "oauth_access_token_ttl_secs",
                &self.oauth_access_token_ttl_secs,
            )
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// Registered OAuth client credentials
#[derive(Clone, Default)]
pub struct OAuthClientConfig {
    /// Client identifier
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Google federated login configuration
#[derive(Clone, Default)]
pub struct GoogleConfig {
    /// OAuth client ID issued by Google
    pub client_id: Option<String>,
    /// OAuth client secret issued by Google
    pub client_secret: Option<String>,
    /// Callback URL registered with Google
    pub redirect_url: Option<String>,
    /// Required hosted domain (`hd` claim), if any
    pub allowed_hd: Option<String>,
}

impl GoogleConfig {
    /// Login can only start when the client id and redirect URL are known
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|v| !v.is_empty())
            && self.redirect_url.as_deref().is_some_and(|v| !v.is_empty())
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("redirect_url", &self.redirect_url)
            .field("allowed_hd", &self.allowed_hd)
            .finish()
    }
}

/// Redis connection and retry configuration
#[derive(Debug, Clone)]
pub struct RedisConnectionConfig {
    /// Connection URL (`redis://[:password@]host:port/db`)
    pub url: String,
    /// Connect timeout in seconds
    pub connection_timeout_secs: u64,
    /// Per-command response timeout in seconds
    pub response_timeout_secs: u64,
    /// Attempts made at startup before failing
    pub initial_connection_retries: u32,
    /// First delay between startup attempts
    pub initial_retry_delay_ms: u64,
    /// Cap for the exponential backoff
    pub max_retry_delay_ms: u64,
    /// Reconnection attempts made by the connection manager after startup
    pub reconnection_retries: usize,
    /// Exponential backoff base for reconnection delays
    pub retry_exponent_base: u64,
}

impl RedisConnectionConfig {
    /// Default timeouts and retry policy for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout_secs: store::REDIS_CONNECT_TIMEOUT_SECS,
            response_timeout_secs: store::REDIS_RESPONSE_TIMEOUT_SECS,
            initial_connection_retries: store::REDIS_INITIAL_RETRIES,
            initial_retry_delay_ms: store::REDIS_INITIAL_RETRY_DELAY_MS,
            max_retry_delay_ms: store::REDIS_MAX_RETRY_DELAY_MS,
            reconnection_retries: 6,
            retry_exponent_base: 2,
        }
    }
}

/// Token store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Selected backend
    pub backend: StoreBackend,
    /// In-memory capacity
    pub max_entries: usize,
    /// Interval between expired-entry sweeps
    pub cleanup_interval: Duration,
    /// Run the background sweeper (disabled in tests)
    pub enable_background_cleanup: bool,
    /// Redis settings, required when `backend` is Redis
    pub redis: Option<RedisConnectionConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            max_entries: store::DEFAULT_MAX_ENTRIES,
            cleanup_interval: Duration::from_secs(store::DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
            redis: None,
        }
    }
}

/// Credential store configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `memory` for the in-process repository, otherwise a sqlx SQLite URL
    pub url: String,
}

impl DatabaseConfig {
    /// Whether the in-process user repository was requested
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_owned(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated origins, or `*`
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the resulting
    /// configuration fails [`ServerConfig::validate`].
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", ""));
        let jwt_expiration_secs: i64 = parse_env_or(
            "JWT_EXPIRATION",
            token_lifetimes::DEFAULT_ACCESS_TOKEN_SECS,
        )?;

        let config = Self {
            host: env_var_or("SERVER_HOST", defaults::SERVER_HOST),
            port: parse_env_or("SERVER_PORT", defaults::SERVER_PORT)?,
            environment,
            log_level: LogLevel::from_str_or_default(&env_var_or(
                "LOG_LEVEL",
                &env_var_or("RUST_LOG", "info"),
            )),
            auth: AuthConfig {
                jwt_secret: load_jwt_secret(environment)?,
                jwt_expiration_secs,
                oauth_access_token_ttl_secs: parse_env_or(
                    "OAUTH_ACCESS_TOKEN_TTL_SECS",
                    jwt_expiration_secs,
                )?,
                bcrypt_cost: parse_env_or("BCRYPT_COST", defaults::BCRYPT_COST)?,
            },
            oauth_client: OAuthClientConfig {
                client_id: env_var_or("OAUTH_CLIENT_ID", ""),
                client_secret: env_var_or("OAUTH_CLIENT_SECRET", ""),
            },
            google: GoogleConfig {
                client_id: optional_env("GOOGLE_CLIENT_ID"),
                client_secret: optional_env("GOOGLE_CLIENT_SECRET"),
                redirect_url: optional_env("GOOGLE_REDIRECT_URL"),
                allowed_hd: optional_env("GOOGLE_ALLOWED_HD"),
            },
            store: StoreConfig {
                backend: env_var_or("STORE_BACKEND", "memory").parse()?,
                max_entries: parse_env_or("STORE_MAX_ENTRIES", store::DEFAULT_MAX_ENTRIES)?,
                cleanup_interval: Duration::from_secs(parse_env_or(
                    "STORE_CLEANUP_INTERVAL_SECS",
                    store::DEFAULT_CLEANUP_INTERVAL_SECS,
                )?),
                enable_background_cleanup: true,
                redis: redis_from_env()?,
            },
            database: DatabaseConfig {
                url: env_var_or("DATABASE_URL", defaults::DATABASE_URL),
            },
            cors: CorsConfig {
                allowed_origins: env_var_or("CORS_ALLOWED_ORIGINS", "*"),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error for settings the server cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(AppError::config_missing("JWT_SECRET"));
        }

        if self.environment.is_production()
            && self.auth.jwt_secret.len() < credential_lengths::MIN_PRODUCTION_JWT_SECRET
        {
            return Err(AppError::config(format!(
                "JWT_SECRET must be at least {} bytes in production",
                credential_lengths::MIN_PRODUCTION_JWT_SECRET
            )));
        }

        validate_lifetime("JWT_EXPIRATION", self.auth.jwt_expiration_secs)?;
        validate_lifetime(
            "OAUTH_ACCESS_TOKEN_TTL_SECS",
            self.auth.oauth_access_token_ttl_secs,
        )?;

        if !defaults::BCRYPT_COST_RANGE.contains(&self.auth.bcrypt_cost) {
            return Err(AppError::config(format!(
                "BCRYPT_COST must be between {} and {}",
                defaults::BCRYPT_COST_RANGE.start(),
                defaults::BCRYPT_COST_RANGE.end()
            )));
        }

        if self.store.backend == StoreBackend::Redis && self.store.redis.is_none() {
            return Err(AppError::config(
                "STORE_BACKEND=redis requires REDIS_URL or REDIS_HOST",
            ));
        }

        if self.oauth_client.client_id.is_empty() || self.oauth_client.client_secret.is_empty() {
            warn!("OAUTH_CLIENT_ID/OAUTH_CLIENT_SECRET not set; every OAuth client will be rejected");
        }

        if !self.google.is_configured() {
            warn!("Google login disabled: GOOGLE_CLIENT_ID or GOOGLE_REDIRECT_URL missing");
        }

        Ok(())
    }

    /// Socket address string to bind
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Kinance Auth Server Configuration:\n\
             - Bind: {}\n\
             - Environment: {}\n\
             - Log Level: {}\n\
             - Access Token TTL: {}s (OAuth: {}s)\n\
             - OAuth Client: {}\n\
             - Google Login: {}\n\
             - Token Store: {}\n\
             - User Database: {}",
            self.bind_address(),
            self.environment,
            self.log_level,
            self.auth.jwt_expiration_secs,
            self.auth.oauth_access_token_ttl_secs,
            if self.oauth_client.client_id.is_empty() {
                "Not configured"
            } else {
                self.oauth_client.client_id.as_str()
            },
            if self.google.is_configured() {
                "Enabled"
            } else {
                "Disabled"
            },
            self.store.backend,
            if self.database.is_memory() {
                "in-memory"
            } else {
                "SQLite"
            },
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Non-empty environment variable
fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, using `default` when unset
fn parse_env_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{raw}': {e}"))),
        None => Ok(default),
    }
}

/// Read `JWT_SECRET`; outside production a missing secret is replaced by a random one
fn load_jwt_secret(environment: Environment) -> AppResult<String> {
    if let Some(secret) = optional_env("JWT_SECRET") {
        return Ok(secret);
    }

    if environment.is_production() {
        return Err(AppError::config_missing("JWT_SECRET"));
    }

    warn!("JWT_SECRET not set; generated an ephemeral secret (tokens will not survive a restart)");
    generate_random_string(credential_lengths::GENERATED_JWT_SECRET)
}

/// Build Redis settings from `REDIS_URL` or the `REDIS_HOST` family
fn redis_from_env() -> AppResult<Option<RedisConnectionConfig>> {
    if let Some(url) = optional_env("REDIS_URL") {
        return Ok(Some(RedisConnectionConfig::new(url)));
    }

    let Some(host) = optional_env("REDIS_HOST") else {
        return Ok(None);
    };
    let port: u16 = parse_env_or("REDIS_PORT", defaults::REDIS_PORT)?;
    let db: u32 = parse_env_or("REDIS_DB", 0)?;
    let url = optional_env("REDIS_PASSWORD").map_or_else(
        || format!("redis://{host}:{port}/{db}"),
        |password| {
            format!(
                "redis://:{}@{host}:{port}/{db}",
                urlencoding::encode(&password)
            )
        },
    );

    Ok(Some(RedisConnectionConfig::new(url)))
}

/// Token lifetimes must be positive and small enough that `now + lifetime` stays representable
fn validate_lifetime(name: &str, secs: i64) -> AppResult<()> {
    if (1..=token_lifetimes::MAX_ACCESS_TOKEN_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "{name} must be between 1 and {} seconds",
            token_lifetimes::MAX_ACCESS_TOKEN_SECS
        )))
    }
}
