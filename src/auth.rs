// ABOUTME: JWT issuance and validation for primary and OAuth access tokens
// ABOUTME: HS256 signing with typed claims and classified validation errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # JWT Management
//!
//! Three token shapes are signed with one shared secret:
//!
//! - primary access tokens ([`AccessClaims`]) carrying the user identity
//! - primary refresh tokens ([`RefreshClaims`]) carrying the subject only, valid 7 days
//! - OAuth access tokens ([`OAuthAccessClaims`]) minted by the authorization server
//!
//! Each shape decodes only into its own claims type, so a refresh token is rejected where an
//! access token is expected and the other way round. Primary tokens are validated by
//! signature and expiry alone: they cannot be revoked before they expire.

use crate::constants::token_lifetimes::REFRESH_TOKEN_DAYS;
use crate::errors::{AppError, AppResult};
use crate::models::{User, UserRole};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// `JWT` validation error with detailed information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Token signature or claims are invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenExpired { expired_at } => write!(
                f,
                "JWT token expired at {}",
                expired_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            Self::TokenInvalid { reason } => write!(f, "JWT token is invalid: {reason}"),
            Self::TokenMalformed { details } => write!(f, "JWT token is malformed: {details}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        Self::auth_invalid(crate::constants::error_messages::INVALID_TOKEN).with_source(error)
    }
}

/// Claims of a primary access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// User `ID`
    pub user_id: Uuid,
    /// User email
    pub email: String,
    /// Household role
    pub role: UserRole,
    /// Subject, the user id as a string
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Claims of a primary refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject, the user id as a string
    pub sub: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id, keeps two tokens minted in the same second distinct
    pub jti: String,
}

/// Claims of an OAuth access token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthAccessClaims {
    /// Client the token was issued to
    pub client_id: String,
    /// Resource owner
    pub user_id: Uuid,
    /// Granted scope
    pub scope: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

trait Expiring {
    fn exp(&self) -> i64;
}

impl Expiring for AccessClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl Expiring for RefreshClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

impl Expiring for OAuthAccessClaims {
    fn exp(&self) -> i64 {
        self.exp
    }
}

/// Signs and validates HS256 tokens with the configured secret
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
}

impl AuthManager {
    /// Create a manager for `secret`, issuing access tokens valid for `access_token_ttl_secs`
    #[must_use]
    pub fn new(secret: &[u8], access_token_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
        }
    }

    /// Primary access token lifetime in seconds
    #[must_use]
    pub const fn access_token_expires_in(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }

    /// Generate a primary access token for `user`
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn generate_access_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_token_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    /// Generate a primary refresh token for `user`, valid for 7 days
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn generate_refresh_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(REFRESH_TOKEN_DAYS)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Sign OAuth access token claims
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn generate_oauth_access_token(&self, claims: &OAuthAccessClaims) -> AppResult<String> {
        self.sign(claims)
    }

    /// Validate a primary access token and return the user id it names
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] for a bad signature, malformed token or expiry.
    pub fn validate_token(&self, token: &str) -> Result<Uuid, JwtValidationError> {
        self.validate_access_token(token).map(|claims| claims.user_id)
    }

    /// Validate a primary access token and return its claims
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] for a bad signature, malformed token or expiry.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtValidationError> {
        let claims: AccessClaims = self.decode_claims(token)?;
        if claims.sub != claims.user_id.to_string() {
            return Err(JwtValidationError::TokenInvalid {
                reason: "subject does not match user_id".to_owned(),
            });
        }
        Ok(claims)
    }

    /// Validate a primary refresh token and return its claims
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] for a bad signature, malformed token or expiry.
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, JwtValidationError> {
        self.decode_claims(token)
    }

    /// Validate an OAuth access token by signature and expiry
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] for a bad signature, malformed token or expiry.
    pub fn validate_oauth_access_token(
        &self,
        token: &str,
    ) -> Result<OAuthAccessClaims, JwtValidationError> {
        self.decode_claims(token)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign JWT: {e}")))
    }

    /// Decode with signature validation, then check expiry with zero leeway
    fn decode_claims<T>(&self, token: &str) -> Result<T, JwtValidationError>
    where
        T: DeserializeOwned + Expiring,
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<T>(token, &self.decoding_key, &validation)
            .map_err(|e| Self::convert_jwt_error(&e))?
            .claims;

        let now = Utc::now();
        if now.timestamp() >= claims.exp() {
            let expired_at = DateTime::from_timestamp(claims.exp(), 0).unwrap_or(now);
            tracing::debug!("JWT token expired at {}", expired_at);
            return Err(JwtValidationError::TokenExpired { expired_at });
        }

        Ok(claims)
    }

    /// Convert JWT library errors to detailed validation errors
    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidAlgorithm => JwtValidationError::TokenInvalid {
                reason: "Token signed with an unexpected algorithm".into(),
            },
            ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
                details: format!("Token claims do not match the expected shape: {json_err}"),
            },
            ErrorKind::Utf8(utf8_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid UTF-8: {utf8_err}"),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    const SECRET: &[u8] = b"unit-test-secret-unit-test-secret";

    fn user() -> User {
        User::from_new(NewUser {
            email: "kid@example.com".to_owned(),
            password_hash: None,
            first_name: "Kid".to_owned(),
            last_name: "Example".to_owned(),
            phone: None,
            role: UserRole::Child,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let manager = AuthManager::new(SECRET, 3600);
        let user = user();
        let token = manager.generate_access_token(&user).unwrap();

        let claims = manager.validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, "kid@example.com");
        assert_eq!(claims.role, UserRole::Child);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(manager.validate_token(&token).unwrap(), user.id);
    }

    #[test]
    fn test_refresh_tokens_are_distinct_and_not_access_tokens() {
        let manager = AuthManager::new(SECRET, 3600);
        let user = user();
        let first = manager.generate_refresh_token(&user).unwrap();
        let second = manager.generate_refresh_token(&user).unwrap();
        assert_ne!(first, second);

        let claims = manager.validate_refresh_token(&first).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.exp - claims.iat, REFRESH_TOKEN_DAYS * 24 * 3600);

        assert!(matches!(
            manager.validate_token(&first),
            Err(JwtValidationError::TokenMalformed { .. })
        ));
        let access = manager.generate_access_token(&user).unwrap();
        assert!(manager.validate_refresh_token(&access).is_err());
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = AuthManager::new(SECRET, 3600)
            .generate_access_token(&user())
            .unwrap();
        let other = AuthManager::new(b"another-secret-another-secret!!!", 3600);

        assert!(matches!(
            other.validate_token(&token),
            Err(JwtValidationError::TokenInvalid { .. })
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = AuthManager::new(SECRET, -10);
        let token = manager.generate_access_token(&user()).unwrap();

        assert!(matches!(
            manager.validate_token(&token),
            Err(JwtValidationError::TokenExpired { .. })
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let user = user();
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            user_id: user.id,
            email: user.email,
            role: user.role,
            sub: user.id.to_string(),
            iat: now,
            exp: now + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(AuthManager::new(SECRET, 3600).validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let manager = AuthManager::new(SECRET, 3600);
        assert!(matches!(
            manager.validate_token("not-a-jwt"),
            Err(JwtValidationError::TokenMalformed { .. })
        ));
    }
}
