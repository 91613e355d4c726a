// ABOUTME: Password authentication service and route handlers
// ABOUTME: Registration, login and refresh issuing primary JWT access/refresh pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Authentication routes for password login
//!
//! Handlers are thin wrappers over [`AuthService`], which owns the business rules:
//! registration validation, constant-time credential checks and token refresh.

use crate::{
    auth::{AuthManager, JwtValidationError},
    constants::{defaults::MIN_PASSWORD_LENGTH, error_messages},
    errors::{ApiResponse, AppError, AppResult, ErrorCode},
    models::{NewUser, User, UserRole},
    resources::ServerResources,
    users::{UserLookup, UserRepository},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Password checked against unknown accounts so every failed login costs one bcrypt verify
const DUMMY_PASSWORD: &str = "kinance-dummy-password";

/// User registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    /// Login email
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
    /// Must equal `password`
    pub confirm_password: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact phone number
    pub phone: Option<String>,
}

/// User registration response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Access token for the new account
    pub token: String,
    /// The created account
    pub user: User,
}

/// User login request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// Token pair issued on login, refresh and federated login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The authenticated account
    pub user: User,
    /// Primary access token
    pub access_token: String,
    /// Primary refresh token
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Refresh token request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshTokenRequest {
    /// Account the refresh token was issued to
    pub user_id: String,
    /// Primary refresh token
    pub refresh_token: String,
}

/// Authentication service for business logic
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    auth_manager: Arc<AuthManager>,
    bcrypt_cost: u32,
    dummy_hash: Arc<OnceLock<String>>,
}

impl AuthService {
    /// Create a service over the given credential store and token signer
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        auth_manager: Arc<AuthManager>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            auth_manager,
            bcrypt_cost,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// Register a new account and return it with a fresh access token
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed input or a duplicate email, otherwise a
    /// database or hashing error.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegisterResponse> {
        let email = normalize_email(&request.email);
        tracing::info!("User registration attempt");

        if !Self::is_valid_email(&email) {
            return Err(AppError::invalid_input(
                error_messages::INVALID_EMAIL_FORMAT,
            ));
        }
        if !Self::is_valid_password(&request.password) {
            return Err(AppError::invalid_input(error_messages::PASSWORD_TOO_SHORT));
        }
        if request.password != request.confirm_password {
            return Err(AppError::invalid_input(
                error_messages::PASSWORDS_DO_NOT_MATCH,
            ));
        }
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(AppError::invalid_input(
                "first_name and last_name are required",
            ));
        }

        match self.users.find_by_email(&email).await {
            UserLookup::Found(_) => {
                return Err(AppError::invalid_input(
                    error_messages::EMAIL_ALREADY_REGISTERED,
                ))
            }
            UserLookup::NotFound => {}
            UserLookup::Error(e) => return Err(e),
        }

        let password_hash = self.hash_password(request.password).await?;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash: Some(password_hash),
                first_name: request.first_name.trim().to_owned(),
                last_name: request.last_name.trim().to_owned(),
                phone: request.phone.filter(|p| !p.trim().is_empty()),
                role: UserRole::default(),
            })
            .await
            .map_err(|e| match e.code {
                // Lost a race with a concurrent registration for the same email
                ErrorCode::ResourceAlreadyExists => {
                    AppError::invalid_input(error_messages::EMAIL_ALREADY_REGISTERED)
                }
                _ => e,
            })?;

        let token = self.auth_manager.generate_access_token(&user)?;
        tracing::info!(user_id = %user.id, "User registered successfully");

        Ok(RegisterResponse { token, user })
    }

    /// Verify credentials and issue a token pair
    ///
    /// Unknown email, missing password hash, wrong password and inactive account all fail
    /// with the same message after the same amount of bcrypt work.
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for bad credentials, or a database error.
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let email = normalize_email(&request.email);

        let user = match self.users.find_by_email(&email).await {
            UserLookup::Found(user) => Some(user),
            UserLookup::NotFound => None,
            UserLookup::Error(e) => return Err(e),
        };

        let stored_hash = user.as_ref().and_then(|u| u.password_hash.clone());
        let password_matches = match stored_hash {
            Some(hash) => self.verify_password(request.password, hash).await?,
            None => {
                let hash = self.dummy_hash().await?;
                self.verify_password(request.password, hash).await?;
                false
            }
        };

        let Some(user) = user.filter(|u| password_matches && u.is_active) else {
            tracing::warn!("Login failed: invalid credentials");
            return Err(AppError::auth_invalid(error_messages::INVALID_CREDENTIALS));
        };

        tracing::info!(user_id = %user.id, "User logged in successfully");
        self.issue_tokens(user)
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for an invalid refresh token, a subject mismatch or an inactive
    /// account, `ResourceNotFound` if the account no longer exists.
    pub async fn refresh_token(&self, request: RefreshTokenRequest) -> AppResult<LoginResponse> {
        let claims = self
            .auth_manager
            .validate_refresh_token(&request.refresh_token)
            .map_err(|e| {
                tracing::warn!(error = %e, "Refresh token rejected");
                AppError::from(e)
            })?;

        if claims.sub != request.user_id.trim() {
            tracing::warn!("Refresh token subject does not match user_id");
            return Err(AppError::auth_invalid(error_messages::INVALID_TOKEN));
        }
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::auth_invalid(error_messages::INVALID_TOKEN))?;

        let user = match self.users.find_by_id(user_id).await {
            UserLookup::Found(user) => user,
            UserLookup::NotFound => return Err(AppError::not_found("User")),
            UserLookup::Error(e) => return Err(e),
        };
        if !user.is_active {
            tracing::warn!(user_id = %user.id, "Refresh attempted for inactive account");
            return Err(AppError::auth_invalid("account is inactive"));
        }

        tracing::info!(user_id = %user.id, "Token refreshed successfully");
        self.issue_tokens(user)
    }

    /// Mint a primary token pair for an already authenticated account
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_tokens(&self, user: User) -> AppResult<LoginResponse> {
        Ok(LoginResponse {
            access_token: self.auth_manager.generate_access_token(&user)?,
            refresh_token: self.auth_manager.generate_refresh_token(&user)?,
            expires_in: self.auth_manager.access_token_expires_in(),
            user,
        })
    }

    /// Validate a primary access token, returning the user id it names
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] describing why the token was rejected.
    pub fn validate_token(&self, token: &str) -> Result<Uuid, JwtValidationError> {
        self.auth_manager.validate_token(token)
    }

    /// Validate email format
    #[must_use]
    pub fn is_valid_email(email: &str) -> bool {
        if email.len() <= 5 || email.chars().any(char::is_whitespace) {
            return false;
        }
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    }

    /// Validate password length
    #[must_use]
    pub fn is_valid_password(password: &str) -> bool {
        password.chars().count() >= MIN_PASSWORD_LENGTH
    }

    /// Hash using `spawn_blocking` to avoid blocking the async executor
    async fn hash_password(&self, password: String) -> AppResult<String> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing error: {e}")))
    }

    async fn verify_password(&self, password: String, hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password verification error: {e}")))
    }

    async fn dummy_hash(&self) -> AppResult<String> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash.clone());
        }
        let hash = self.hash_password(DUMMY_PASSWORD.to_owned()).await?;
        Ok(self.dummy_hash.get_or_init(|| hash).clone())
    }
}

/// Emails are compared case-insensitively
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all password authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/register", post(Self::handle_register))
            .route("/auth/login", post(Self::handle_login))
            .route("/auth/refresh", post(Self::handle_refresh))
            .with_state(resources)
    }

    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<RegisterRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let Json(request) = body?;
        let response = resources.auth_service.register(request).await?;
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::ok_with_message(
                response,
                "User registered successfully",
            )),
        )
            .into_response())
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<LoginRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let Json(request) = body?;
        let response = resources.auth_service.login(request).await?;
        Ok((StatusCode::OK, Json(ApiResponse::ok(response))).into_response())
    }

    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<RefreshTokenRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let Json(request) = body?;
        let response = resources.auth_service.refresh_token(request).await?;
        Ok((StatusCode::OK, Json(ApiResponse::ok(response))).into_response())
    }
}
