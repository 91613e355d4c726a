// ABOUTME: System-wide constants for the authorization server
// ABOUTME: Token lifetimes, store key prefixes, protocol strings, and configuration defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Hardcoded protocol values and the defaults used when an environment variable is unset.

/// Service identity used in logs and health responses
pub mod service_names {
    /// Service name for structured logging
    pub const KINANCE_AUTH_SERVER: &str = "kinance-auth-server";
    /// API version prefix for all versioned routes
    pub const API_V1_PREFIX: &str = "/api/v1";
}

/// Token and record lifetimes
pub mod token_lifetimes {
    /// Default access token lifetime in seconds (`JWT_EXPIRATION`)
    pub const DEFAULT_ACCESS_TOKEN_SECS: i64 = 3600;
    /// Primary refresh token lifetime, fixed at 7 days
    pub const REFRESH_TOKEN_DAYS: i64 = 7;
    /// Authorization code lifetime
    pub const AUTHORIZATION_CODE_MINUTES: i64 = 10;
    /// Federated login state lifetime
    pub const OAUTH_STATE_MINUTES: i64 = 10;
    /// Upper bound for configured access token lifetimes (one year)
    pub const MAX_ACCESS_TOKEN_SECS: i64 = 365 * 24 * 60 * 60;
}

/// Random credential lengths (in URL-safe characters)
pub mod credential_lengths {
    /// Authorization code length
    pub const AUTHORIZATION_CODE: usize = 32;
    /// Opaque OAuth refresh token length
    pub const OAUTH_REFRESH_TOKEN: usize = 64;
    /// Federated login state length
    pub const OAUTH_STATE: usize = 32;
    /// Generated development JWT secret length
    pub const GENERATED_JWT_SECRET: usize = 64;
    /// Minimum accepted JWT secret length in production
    pub const MIN_PRODUCTION_JWT_SECRET: usize = 32;
}

/// Token store key namespaces
pub mod store_keys {
    /// Access and refresh token records
    pub const TOKEN_PREFIX: &str = "oauth:token:";
    /// Authorization codes
    pub const CODE_PREFIX: &str = "oauth:code:";
    /// Federated login state values
    pub const STATE_PREFIX: &str = "oauth:state:";
    /// Value stored under a state key
    pub const STATE_MARKER: &str = "1";
}

/// Token store defaults
pub mod store {
    /// Default in-memory store capacity
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;
    /// Default interval between expired-entry sweeps
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
    /// Redis connect timeout
    pub const REDIS_CONNECT_TIMEOUT_SECS: u64 = 5;
    /// Redis response timeout
    pub const REDIS_RESPONSE_TIMEOUT_SECS: u64 = 3;
    /// Initial connection attempts before giving up
    pub const REDIS_INITIAL_RETRIES: u32 = 3;
    /// First backoff delay between connection attempts
    pub const REDIS_INITIAL_RETRY_DELAY_MS: u64 = 250;
    /// Backoff cap
    pub const REDIS_MAX_RETRY_DELAY_MS: u64 = 4_000;
}

/// OAuth 2.0 protocol strings
pub mod oauth {
    /// Token type reported in token and introspection responses
    pub const TOKEN_TYPE_BEARER: &str = "Bearer";
    /// Only supported `response_type`
    pub const RESPONSE_TYPE_CODE: &str = "code";
    /// `grant_type` for code exchange
    pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
    /// `grant_type` for refresh
    pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
}

/// Google federated login endpoints and parameters
pub mod google {
    /// Authorization endpoint
    pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    /// Token endpoint
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
    /// ID token verification endpoint
    pub const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
    /// Requested scopes
    pub const SCOPES: [&str; 3] = ["openid", "email", "profile"];
    /// Account chooser plus forced consent
    pub const PROMPT: &str = "select_account consent";
    /// Request a provider refresh token
    pub const ACCESS_TYPE: &str = "offline";
    /// Accepted `iss` values for Google ID tokens
    pub const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
}

/// Server and credential defaults
pub mod defaults {
    /// Default bind host
    pub const SERVER_HOST: &str = "0.0.0.0";
    /// Default HTTP port
    pub const SERVER_PORT: u16 = 8080;
    /// Default user database
    pub const DATABASE_URL: &str = "sqlite:./data/kinance.db";
    /// Default Redis port
    pub const REDIS_PORT: u16 = 6379;
    /// Minimum password length at registration
    pub const MIN_PASSWORD_LENGTH: usize = 8;
    /// bcrypt cost when `BCRYPT_COST` is unset
    pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
    /// Work factors accepted by bcrypt
    pub const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;
    /// Outbound HTTP request timeout for the identity provider
    pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 15;
    /// Outbound HTTP connect timeout for the identity provider
    pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
}

/// Client-facing error messages
pub mod error_messages {
    /// Login failure, identical for unknown email and wrong password
    pub const INVALID_CREDENTIALS: &str = "invalid credentials";
    /// Bearer gate: no Authorization header
    pub const AUTH_HEADER_REQUIRED: &str = "Authorization header required";
    /// Bearer gate: anything wrong with the presented token
    pub const INVALID_TOKEN: &str = "Invalid token";
    /// Registration: confirm_password differs
    pub const PASSWORDS_DO_NOT_MATCH: &str = "passwords do not match";
    /// Registration: duplicate email
    pub const EMAIL_ALREADY_REGISTERED: &str = "email already registered";
    /// Registration: malformed email
    pub const INVALID_EMAIL_FORMAT: &str = "invalid email format";
    /// Registration: short password
    pub const PASSWORD_TOO_SHORT: &str = "password must be at least 8 characters";
    /// Federated callback: missing query parameters
    pub const MISSING_STATE_OR_CODE: &str = "missing state or code";
    /// Federated callback: unknown, expired or replayed state
    pub const INVALID_STATE: &str = "invalid state";
    /// Federated callback: provider rejected the code
    pub const CODE_EXCHANGE_FAILED: &str = "failed to exchange code";
    /// Federated callback: provider response had no ID token
    pub const ID_TOKEN_MISSING: &str = "id_token not present in token response";
    /// Federated callback: ID token failed verification
    pub const ID_TOKEN_INVALID: &str = "invalid id_token";
    /// Federated callback: email missing or unverified
    pub const EMAIL_NOT_VERIFIED: &str = "email not verified";
    /// Federated callback: hosted domain not allowed
    pub const UNAUTHORIZED_DOMAIN: &str = "unauthorized domain";
    /// Federated login: provider credentials not configured
    pub const GOOGLE_MISCONFIGURED: &str =
        "Google OAuth misconfigured: set GOOGLE_CLIENT_ID and GOOGLE_REDIRECT_URL";
}
