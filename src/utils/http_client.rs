// ABOUTME: Shared HTTP client utilities with connection pooling and timeout configuration
// ABOUTME: Builds the outbound client used for identity provider token exchanges

use crate::constants::defaults::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Create a new HTTP client with custom timeout settings
///
/// Falls back to a default client if the builder fails (TLS backend initialization).
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Create a new HTTP client optimized for OAuth flows
///
/// Token exchanges should be fast, so this client uses short timeouts.
#[must_use]
pub fn oauth_client() -> Client {
    create_client_with_timeout(HTTP_REQUEST_TIMEOUT_SECS, HTTP_CONNECT_TIMEOUT_SECS)
}
