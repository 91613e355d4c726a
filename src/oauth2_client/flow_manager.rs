// ABOUTME: Federated Google login flow: state issuance, callback validation and user upsert
// ABOUTME: Mints primary JWT pairs for verified Google identities via the password auth service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::client::{GoogleIdentity, GoogleIdentityProvider};
use crate::constants::{credential_lengths, error_messages, token_lifetimes::OAUTH_STATE_MINUTES};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{NewUser, User, UserRole};
use crate::routes::auth::{AuthService, LoginResponse};
use crate::store::TokenStore;
use crate::users::{UserLookup, UserRepository};
use crate::utils::random::generate_random_string;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives the Google redirect flow and maps identities to local accounts
#[derive(Clone)]
pub struct GoogleLoginService {
    provider: Option<Arc<dyn GoogleIdentityProvider>>,
    store: Arc<dyn TokenStore>,
    users: Arc<dyn UserRepository>,
    auth_service: AuthService,
    allowed_hd: Option<String>,
}

impl GoogleLoginService {
    /// Create the flow; a `None` provider makes login report misconfiguration
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn GoogleIdentityProvider>>,
        store: Arc<dyn TokenStore>,
        users: Arc<dyn UserRepository>,
        auth_service: AuthService,
        allowed_hd: Option<String>,
    ) -> Self {
        Self {
            provider,
            store,
            users,
            auth_service,
            allowed_hd: allowed_hd.filter(|hd| !hd.is_empty()),
        }
    }

    /// Issue a single-use state and return the provider consent URL
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` when Google login is not configured, or a store error.
    pub async fn login(&self) -> AppResult<String> {
        let provider = self.provider()?;

        let state = generate_random_string(credential_lengths::OAUTH_STATE)?;
        self.store
            .store_state(&state, Utc::now() + Duration::minutes(OAUTH_STATE_MINUTES))
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store Google login state");
                e
            })?;

        provider.authorization_url(&state)
    }

    /// Complete the flow for the provider callback
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a missing or unusable state or code, `AuthInvalid` for an
    /// unverified email, a disallowed domain or a rejected ID token, and an internal error
    /// when the account cannot be loaded or created.
    pub async fn callback(
        &self,
        state: Option<&str>,
        code: Option<&str>,
    ) -> AppResult<LoginResponse> {
        let (Some(state), Some(code)) = (
            state.filter(|s| !s.is_empty()),
            code.filter(|c| !c.is_empty()),
        ) else {
            return Err(AppError::invalid_input(error_messages::MISSING_STATE_OR_CODE));
        };

        if !self.store.consume_state(state).await? {
            warn!("Google callback with unknown, expired or replayed state");
            return Err(AppError::invalid_input(error_messages::INVALID_STATE));
        }

        let identity = self.provider()?.exchange_code(code).await.map_err(|e| {
            warn!(error = %e, "Google code exchange failed");
            AppError::from(e)
        })?;

        self.check_identity(&identity)?;

        let user = self.upsert_user(identity).await?;
        if !user.is_active {
            warn!(user_id = %user.id, "Google login for inactive account");
            return Err(AppError::auth_invalid(error_messages::INVALID_CREDENTIALS));
        }

        info!(user_id = %user.id, "Google login succeeded");
        self.auth_service.issue_tokens(user)
    }

    fn provider(&self) -> AppResult<&Arc<dyn GoogleIdentityProvider>> {
        self.provider.as_ref().ok_or_else(|| {
            error!("Google login requested but GOOGLE_CLIENT_ID/GOOGLE_REDIRECT_URL are unset");
            AppError::new(ErrorCode::ConfigMissing, error_messages::GOOGLE_MISCONFIGURED)
        })
    }

    fn check_identity(&self, identity: &GoogleIdentity) -> AppResult<()> {
        if identity.email.is_empty() || !identity.email_verified {
            warn!("Google identity without a verified email");
            return Err(AppError::auth_invalid(error_messages::EMAIL_NOT_VERIFIED));
        }

        if let Some(allowed) = &self.allowed_hd {
            if identity.hd.as_deref() != Some(allowed.as_str()) {
                warn!(hd = ?identity.hd, "Google identity from a disallowed domain");
                return Err(AppError::auth_invalid(error_messages::UNAUTHORIZED_DOMAIN));
            }
        }

        Ok(())
    }

    async fn upsert_user(&self, identity: GoogleIdentity) -> AppResult<User> {
        let email = identity.email.trim().to_lowercase();

        match self.users.find_by_email(&email).await {
            UserLookup::Found(user) => Ok(user),
            UserLookup::NotFound => {
                let new_user = NewUser {
                    email,
                    password_hash: None,
                    first_name: identity.given_name,
                    last_name: identity.family_name,
                    phone: None,
                    role: UserRole::default(),
                };
                self.create_user(new_user).await
            }
            UserLookup::Error(e) => Err(Self::lookup_failed(e)),
        }
    }

    /// Create a federated account, adopting the winner of a concurrent first login
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let email = new_user.email.clone();

        match self.users.create(new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "Created account from Google identity");
                Ok(user)
            }
            Err(e) if e.code == ErrorCode::ResourceAlreadyExists => {
                debug!("Federated account created concurrently, reloading");
                match self.users.find_by_email(&email).await {
                    UserLookup::Found(user) => Ok(user),
                    UserLookup::NotFound => {
                        error!("Federated account reported as existing but not found");
                        Err(AppError::internal("Failed to create user").with_source(e))
                    }
                    UserLookup::Error(lookup_error) => Err(Self::lookup_failed(lookup_error)),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to create federated user");
                Err(AppError::internal("Failed to create user").with_source(e))
            }
        }
    }

    fn lookup_failed(e: AppError) -> AppError {
        error!(error = %e, "User lookup failed during Google login");
        AppError::internal("Failed to load user").with_source(e)
    }
}
