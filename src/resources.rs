// ABOUTME: Centralized resource container for dependency injection into route handlers
// ABOUTME: Wires configuration, stores and services once and shares them behind an Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources Module
//!
//! Every collaborator a handler needs is constructed here once and injected through axum
//! state, so no service reaches for globals.

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::oauth2_client::{GoogleIdentityProvider, GoogleLoginService, GoogleOAuthClient};
use crate::oauth2_server::OAuth2AuthorizationServer;
use crate::routes::auth::AuthService;
use crate::store::TokenStore;
use crate::users::UserRepository;
use std::sync::Arc;

/// Shared services and backends
#[derive(Clone)]
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// JWT signer shared by primary and OAuth tokens
    pub auth_manager: Arc<AuthManager>,
    /// Credential store
    pub users: Arc<dyn UserRepository>,
    /// Token/code/state store
    pub token_store: Arc<dyn TokenStore>,
    /// Password authentication service
    pub auth_service: AuthService,
    /// OAuth 2.0 authorization server
    pub oauth_server: OAuth2AuthorizationServer,
    /// Google federated login
    pub google_login: GoogleLoginService,
}

impl ServerResources {
    /// Wire all services over the given backends
    ///
    /// `google` is the identity provider used for federated login; `None` leaves Google
    /// login reporting misconfiguration.
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        users: Arc<dyn UserRepository>,
        token_store: Arc<dyn TokenStore>,
        google: Option<Arc<dyn GoogleIdentityProvider>>,
    ) -> Self {
        let auth_manager = Arc::new(AuthManager::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.jwt_expiration_secs,
        ));

        let auth_service = AuthService::new(
            Arc::clone(&users),
            Arc::clone(&auth_manager),
            config.auth.bcrypt_cost,
        );

        let oauth_server = OAuth2AuthorizationServer::new(
            Arc::clone(&token_store),
            Arc::clone(&auth_manager),
            config.oauth_client.clone(),
            config.auth.oauth_access_token_ttl_secs,
        );

        let google_login = GoogleLoginService::new(
            google,
            Arc::clone(&token_store),
            Arc::clone(&users),
            auth_service.clone(),
            config.google.allowed_hd.clone(),
        );

        Self {
            config,
            auth_manager,
            users,
            token_store,
            auth_service,
            oauth_server,
            google_login,
        }
    }

    /// Create a new builder for `ServerResources`
    #[must_use]
    pub const fn builder() -> ServerResourcesBuilder {
        ServerResourcesBuilder::new()
    }
}

/// Builder for `ServerResources`
///
/// When no identity provider is set, one is derived from the Google configuration.
pub struct ServerResourcesBuilder {
    config: Option<Arc<ServerConfig>>,
    users: Option<Arc<dyn UserRepository>>,
    token_store: Option<Arc<dyn TokenStore>>,
    google: Option<Arc<dyn GoogleIdentityProvider>>,
}

impl ServerResourcesBuilder {
    /// Create an empty builder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            config: None,
            users: None,
            token_store: None,
            google: None,
        }
    }

    /// Set the server configuration
    #[must_use]
    pub fn with_config(mut self, config: Arc<ServerConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential store
    #[must_use]
    pub fn with_users(mut self, users: Arc<dyn UserRepository>) -> Self {
        self.users = Some(users);
        self
    }

    /// Set the token store
    #[must_use]
    pub fn with_token_store(mut self, token_store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(token_store);
        self
    }

    /// Override the Google identity provider
    #[must_use]
    pub fn with_google_provider(mut self, provider: Arc<dyn GoogleIdentityProvider>) -> Self {
        self.google = Some(provider);
        self
    }

    /// Build the `ServerResources`
    ///
    /// # Errors
    ///
    /// Returns an error if any required component is missing
    pub fn build(self) -> AppResult<ServerResources> {
        let config = self
            .config
            .ok_or_else(|| AppError::config("Server config is required"))?;
        let users = self
            .users
            .ok_or_else(|| AppError::config("User repository is required"))?;
        let token_store = self
            .token_store
            .ok_or_else(|| AppError::config("Token store is required"))?;

        let google = self.google.or_else(|| {
            GoogleOAuthClient::from_config(&config.google)
                .map(|client| Arc::new(client) as Arc<dyn GoogleIdentityProvider>)
        });

        Ok(ServerResources::new(config, users, token_store, google))
    }

    /// Build the `ServerResources` wrapped in an `Arc`
    ///
    /// # Errors
    ///
    /// Returns an error if any required component is missing
    pub fn build_arc(self) -> AppResult<Arc<ServerResources>> {
        Ok(Arc::new(self.build()?))
    }
}

impl Default for ServerResourcesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
