// ABOUTME: OAuth 2.0 authorization server with JWT access tokens underneath
// ABOUTME: Authorization code and refresh token grants backed by the token store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// OAuth 2.0 authorization server endpoints
pub mod endpoints;
/// OAuth 2.0 data models and types
pub mod models;
/// HTTP routes for the authorization server
pub mod routes;

/// OAuth 2.0 authorization server
pub use endpoints::OAuth2AuthorizationServer;

/// Authorization request
pub use models::AuthorizeRequest;
/// Stored authorization code
pub use models::AuthorizationCode;
/// Introspection response
pub use models::IntrospectionResponse;
/// OAuth 2.0 error response body
pub use models::OAuth2ErrorResponse;
/// Authorization server failures
pub use models::OAuthError;
/// Stored token record
pub use models::StoredToken;
/// Token exchange request
pub use models::TokenRequest;
/// Token exchange response
pub use models::TokenResponse;

/// HTTP routes
pub use routes::OAuth2Routes;
