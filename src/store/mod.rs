// ABOUTME: TTL-bound key-value store for OAuth tokens, authorization codes and login state
// ABOUTME: Pluggable backend support (in-memory, Redis) behind the TokenStore trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Store
//!
//! Three independent namespaces share one store:
//!
//! - `oauth:token:` token records, written twice (under the access token and under the
//!   refresh token) so either credential resolves the same record
//! - `oauth:code:` single-use authorization codes
//! - `oauth:state:` single-use federated login state values
//!
//! Every read re-checks the record's wall-clock expiry, deleting stale records, so
//! correctness never depends on when the backend actually evicts.

/// Backend selection
pub mod factory;
/// In-memory store with LRU eviction
pub mod memory;
/// Redis store
pub mod redis;

use crate::constants::store_keys::{CODE_PREFIX, STATE_PREFIX, TOKEN_PREFIX};
use crate::errors::{AppError, AppResult};
use crate::oauth2_server::models::{AuthorizationCode, StoredToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub use factory::create_token_store;
pub use memory::InMemoryTokenStore;
pub use redis::RedisTokenStore;

/// Storage for OAuth records with per-key time-to-live
///
/// Lookups return `Ok(None)` for absent or expired keys; errors are reserved for backend
/// failures.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a token record under both its access and refresh token, atomically
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the record has already expired, or a storage error.
    async fn store_token(&self, record: &StoredToken) -> AppResult<()>;

    /// Resolve a token record by access or refresh token
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    async fn get_token(&self, token: &str) -> AppResult<Option<StoredToken>>;

    /// Delete both keys of the record `token` resolves to
    ///
    /// Returns `true` only for the call that removed the record, so concurrent callers
    /// can tell which of them won.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    async fn revoke_token(&self, token: &str) -> AppResult<bool>;

    /// Store an authorization code
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the code has already expired, or a storage error.
    async fn store_code(&self, code: &AuthorizationCode) -> AppResult<()>;

    /// Read an authorization code without consuming it
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    async fn get_code(&self, code: &str) -> AppResult<Option<AuthorizationCode>>;

    /// Read and delete an authorization code in one atomic step
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    async fn take_code(&self, code: &str) -> AppResult<Option<AuthorizationCode>>;

    /// Delete an authorization code; absent codes are not an error
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    async fn delete_code(&self, code: &str) -> AppResult<()>;

    /// Store a login state value until `expires_at`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `expires_at` is not in the future, or a storage error.
    async fn store_state(&self, state: &str, expires_at: DateTime<Utc>) -> AppResult<()>;

    /// Delete a state value, reporting whether it existed, in one atomic step
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend fails.
    async fn consume_state(&self, state: &str) -> AppResult<bool>;

    /// Verify the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not answer.
    async fn health_check(&self) -> AppResult<()>;

    /// Backend name for logs and readiness output
    fn backend_name(&self) -> &'static str;
}

/// Key of a token record
#[must_use]
pub fn token_key(token: &str) -> String {
    format!("{TOKEN_PREFIX}{token}")
}

/// Key of an authorization code
#[must_use]
pub fn code_key(code: &str) -> String {
    format!("{CODE_PREFIX}{code}")
}

/// Key of a login state value
#[must_use]
pub fn state_key(state: &str) -> String {
    format!("{STATE_PREFIX}{state}")
}

/// Remaining lifetime until `expires_at`, rejecting records that are already stale
///
/// # Errors
///
/// Returns `InvalidInput` when `expires_at` is not in the future.
pub fn ttl_until(expires_at: DateTime<Utc>, what: &str) -> AppResult<Duration> {
    (expires_at - Utc::now())
        .to_std()
        .ok()
        .filter(|ttl| !ttl.is_zero())
        .ok_or_else(|| AppError::invalid_input(format!("{what} already expired")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(token_key("abc"), "oauth:token:abc");
        assert_eq!(code_key("abc"), "oauth:code:abc");
        assert_eq!(state_key("abc"), "oauth:state:abc");
    }

    #[test]
    fn test_ttl_until_rejects_past_expiry() {
        let error = ttl_until(Utc::now() - chrono::Duration::seconds(1), "token").unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidInput);
        assert_eq!(error.message, "token already expired");

        let ttl = ttl_until(Utc::now() + chrono::Duration::minutes(10), "code").unwrap();
        assert!(ttl > Duration::from_secs(590));
    }
}
