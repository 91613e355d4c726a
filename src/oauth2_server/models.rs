// ABOUTME: OAuth 2.0 data models for the authorization code and refresh token grants
// ABOUTME: Stored records, request/response structures and the OAuth error taxonomy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::oauth::TOKEN_TYPE_BEARER;
use crate::errors::AppError;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Single-use authorization code awaiting exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The code value handed to the client
    pub code: String,
    /// Client that requested the code
    pub client_id: String,
    /// Redirect URI the code was issued for
    pub redirect_uri: String,
    /// Requested scope (may be empty)
    pub scope: String,
    /// Resource owner who approved the request
    pub user_id: Uuid,
    /// Wall-clock expiry
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// Whether the expiry has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Token record indexed by both its access and its refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    /// Signed JWT access token
    pub access_token: String,
    /// Opaque refresh token
    pub refresh_token: String,
    /// Client the grant was issued to
    pub client_id: String,
    /// Resource owner
    pub user_id: Uuid,
    /// Granted scope (may be empty)
    pub scope: String,
    /// Shared expiry of both credentials
    pub expires_at: DateTime<Utc>,
    /// When the grant was issued
    pub created_at: DateTime<Utc>,
}

impl StoredToken {
    /// Whether the expiry has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// OAuth 2.0 Authorization Request
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthorizeRequest {
    /// Response type, only `code` is supported
    pub response_type: String,
    /// Client identifier
    pub client_id: String,
    /// Redirect URI for response
    pub redirect_uri: String,
    /// Requested scopes
    pub scope: Option<String>,
    /// State parameter for CSRF protection
    pub state: Option<String>,
}

/// OAuth 2.0 Token Request
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct TokenRequest {
    /// Grant type (`authorization_code` or `refresh_token`)
    pub grant_type: String,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
    /// Authorization code (for `authorization_code` grant)
    pub code: Option<String>,
    /// Redirect URI (must match the one the code was issued for)
    pub redirect_uri: Option<String>,
    /// Refresh token (for `refresh_token` grant)
    pub refresh_token: Option<String>,
}

/// Token introspection request (RFC 7662)
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct IntrospectRequest {
    /// Access or refresh token to inspect
    pub token: String,
}

/// Token revocation request (RFC 7009)
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RevokeRequest {
    /// Access or refresh token to revoke
    pub token: String,
    /// Client ID
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

/// OAuth 2.0 Token Response
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenResponse {
    /// Access token (JWT)
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Expires in seconds
    pub expires_in: i64,
    /// Refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scopes granted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Token introspection response (RFC 7662)
///
/// Inactive tokens report `active: false` and nothing else.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IntrospectionResponse {
    /// Whether the token is currently valid
    pub active: bool,
    /// Granted scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Client the token belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Resource owner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Token type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as a Unix timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IntrospectionResponse {
    /// Response for unknown, expired or revoked tokens
    #[must_use]
    pub const fn inactive() -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            user_id: None,
            token_type: None,
            exp: None,
        }
    }

    /// Response describing a live token record
    #[must_use]
    pub fn active(record: &StoredToken) -> Self {
        Self {
            active: true,
            scope: Some(record.scope.clone()).filter(|s| !s.is_empty()),
            client_id: Some(record.client_id.clone()),
            user_id: Some(record.user_id.to_string()),
            token_type: Some(TOKEN_TYPE_BEARER.to_owned()),
            exp: Some(record.expires_at.timestamp()),
        }
    }
}

/// OAuth 2.0 Error Response body (RFC 6749 section 5.2)
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuth2ErrorResponse {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Failures of the authorization server operations
///
/// Variants are precise for logging; the wire code is deliberately coarse so a client
/// cannot tell a replayed code from a client mismatch.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Client credentials or `client_id` did not match the registered client
    #[error("client authentication failed")]
    InvalidClient,
    /// The grant does not belong to the requesting client or redirect URI, or is incomplete
    #[error("invalid grant: {0}")]
    InvalidGrant(String),
    /// Authorization code unknown, expired or already used
    #[error("authorization code not found or expired")]
    InvalidCode,
    /// Refresh token unknown, expired, revoked or already rotated
    #[error("refresh token not found or expired")]
    InvalidRefreshToken,
    /// `grant_type` other than `authorization_code` or `refresh_token`
    #[error("unsupported grant type")]
    UnsupportedGrantType,
    /// `response_type` other than `code`
    #[error("unsupported response type")]
    UnsupportedResponseType,
    /// The resource owner is not authenticated
    #[error("resource owner not authenticated")]
    AccessDenied,
    /// A required parameter is missing or malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Store, signing or randomness failure
    #[error("server error: {0}")]
    ServerError(#[from] AppError),
}

impl OAuthError {
    /// RFC 6749 error code sent to the client
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant(_) | Self::InvalidCode | Self::InvalidRefreshToken => {
                "invalid_grant"
            }
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::AccessDenied => "access_denied",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ServerError(_) => "server_error",
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidClient | Self::AccessDenied => StatusCode::UNAUTHORIZED,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidGrant(_)
            | Self::InvalidCode
            | Self::InvalidRefreshToken
            | Self::UnsupportedGrantType
            | Self::UnsupportedResponseType
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Wire body for this error
    #[must_use]
    pub fn to_response_body(&self) -> OAuth2ErrorResponse {
        let error_description = match self {
            Self::UnsupportedGrantType => {
                Some("grant_type must be authorization_code or refresh_token")
            }
            Self::UnsupportedResponseType => Some("only response_type=code is supported"),
            Self::InvalidRequest(detail) => Some(detail.as_str()),
            _ => None,
        };

        OAuth2ErrorResponse {
            error: self.error_code().to_owned(),
            error_description: error_description.map(str::to_owned),
        }
    }
}

impl From<FormRejection> for OAuthError {
    fn from(rejection: FormRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for OAuthError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        if let Self::ServerError(ref source) = self {
            tracing::error!(error = %source, "OAuth request failed with server error");
        }
        (self.http_status(), Json(self.to_response_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> StoredToken {
        let now = Utc::now();
        StoredToken {
            access_token: "access".to_owned(),
            refresh_token: "refresh".to_owned(),
            client_id: "kinance-web".to_owned(),
            user_id: Uuid::new_v4(),
            scope: String::new(),
            expires_at: now + Duration::hours(1),
            created_at: now,
        }
    }

    #[test]
    fn test_grant_failures_share_wire_code() {
        assert_eq!(OAuthError::InvalidCode.error_code(), "invalid_grant");
        assert_eq!(OAuthError::InvalidRefreshToken.error_code(), "invalid_grant");
        assert_eq!(
            OAuthError::InvalidGrant("client mismatch".to_owned()).error_code(),
            "invalid_grant"
        );
        assert_eq!(
            OAuthError::InvalidCode.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OAuthError::InvalidClient.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_server_error_hides_detail() {
        let error = OAuthError::from(AppError::storage("connection refused"));
        let body = serde_json::to_value(error.to_response_body()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "server_error"}));
    }

    #[test]
    fn test_inactive_introspection_is_bare() {
        let body = serde_json::to_value(IntrospectionResponse::inactive()).unwrap();
        assert_eq!(body, serde_json::json!({"active": false}));
    }

    #[test]
    fn test_active_introspection_omits_empty_scope() {
        let record = record();
        let response = IntrospectionResponse::active(&record);
        assert!(response.active);
        assert_eq!(response.scope, None);
        assert_eq!(response.client_id.as_deref(), Some("kinance-web"));
        assert_eq!(response.exp, Some(record.expires_at.timestamp()));
    }
}
