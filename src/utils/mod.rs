// ABOUTME: Utility modules for common functionality across the application
// ABOUTME: Contains bearer header parsing, outbound HTTP clients, and secure random strings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

/// Bearer token extraction from Authorization headers
pub mod auth;
/// HTTP client configuration and helpers
pub mod http_client;
/// Cryptographically secure URL-safe random strings
pub mod random;
