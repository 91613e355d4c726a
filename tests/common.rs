// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides configuration, in-memory backends, user creation and a mock identity provider
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `kinance_auth_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use async_trait::async_trait;
use kinance_auth_server::{
    config::{
        AuthConfig, CorsConfig, DatabaseConfig, Environment, GoogleConfig, LogLevel,
        OAuthClientConfig, ServerConfig, StoreConfig,
    },
    errors::AppResult,
    models::User,
    oauth2_client::{GoogleError, GoogleIdentity, GoogleIdentityProvider},
    resources::ServerResources,
    routes::auth::RegisterRequest,
    store::{InMemoryTokenStore, TokenStore},
    users::{InMemoryUserRepository, UserRepository},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Registered OAuth client used across tests
pub const TEST_CLIENT_ID: &str = "kinance-web";
/// Secret of the registered OAuth client
pub const TEST_CLIENT_SECRET: &str = "kinance-web-secret";
/// Redirect URI used by the registered client
pub const TEST_REDIRECT_URI: &str = "https://app.kinance.test/callback";
/// Password used for every registered test user
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // Check for TEST_LOG environment variable to control test logging level
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN, // Default to WARN for quiet tests
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration with in-memory backends, a fixed secret and the cheapest bcrypt cost
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        environment: Environment::Testing,
        log_level: LogLevel::Warn,
        auth: AuthConfig {
            bcrypt_cost: 4,
            ..AuthConfig::new("kinance-test-secret-kinance-test-secret")
        },
        oauth_client: OAuthClientConfig {
            client_id: TEST_CLIENT_ID.to_owned(),
            client_secret: TEST_CLIENT_SECRET.to_owned(),
        },
        google: GoogleConfig::default(),
        store: StoreConfig {
            enable_background_cleanup: false, // Disable in tests to avoid tokio runtime conflicts
            ..StoreConfig::default()
        },
        database: DatabaseConfig {
            url: "memory".to_owned(),
        },
        cors: CorsConfig::default(),
    }
}

/// In-memory token store without the background sweeper
pub fn create_test_store() -> Arc<InMemoryTokenStore> {
    Arc::new(InMemoryTokenStore::new(&test_config().store))
}

/// Resources over in-memory backends; Google login reports misconfiguration
pub fn create_test_resources() -> Arc<ServerResources> {
    create_test_resources_with(test_config(), None)
}

/// Resources over in-memory backends with the given Google provider
pub fn create_test_resources_with_google(
    provider: Arc<dyn GoogleIdentityProvider>,
) -> Arc<ServerResources> {
    create_test_resources_with(test_config(), Some(provider))
}

/// Resources over in-memory backends with a custom configuration
pub fn create_test_resources_with(
    config: ServerConfig,
    google: Option<Arc<dyn GoogleIdentityProvider>>,
) -> Arc<ServerResources> {
    init_test_logging();
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let store: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new(&config.store));
    Arc::new(ServerResources::new(Arc::new(config), users, store, google))
}

/// Registration payload for `email` with [`TEST_PASSWORD`]
pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_owned(),
        password: TEST_PASSWORD.to_owned(),
        confirm_password: TEST_PASSWORD.to_owned(),
        first_name: "Ada".to_owned(),
        last_name: "Okafor".to_owned(),
        phone: None,
    }
}

/// Register a user through the auth service
pub async fn register_user(resources: &ServerResources, email: &str) -> AppResult<User> {
    Ok(resources
        .auth_service
        .register(registration(email))
        .await?
        .user)
}

/// Outcome a [`MockGoogleProvider`] returns for every code
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Exchange succeeds with this identity
    Identity(GoogleIdentity),
    /// Token endpoint rejects the code
    ExchangeFails,
    /// Token response lacks an ID token
    MissingIdToken,
}

/// Identity provider answering without network access
pub struct MockGoogleProvider {
    outcome: MockOutcome,
    exchanges: AtomicUsize,
}

impl MockGoogleProvider {
    /// Provider returning `outcome` for every exchange
    pub fn new(outcome: MockOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            exchanges: AtomicUsize::new(0),
        })
    }

    /// Provider asserting a verified identity for `email`
    pub fn verified(email: &str, hd: Option<&str>) -> Arc<Self> {
        Self::new(MockOutcome::Identity(GoogleIdentity {
            email: email.to_owned(),
            email_verified: true,
            given_name: "Grace".to_owned(),
            family_name: "Mensah".to_owned(),
            hd: hd.map(str::to_owned),
        }))
    }

    /// Number of code exchanges attempted
    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GoogleIdentityProvider for MockGoogleProvider {
    fn authorization_url(&self, state: &str) -> AppResult<String> {
        Ok(format!(
            "https://accounts.google.test/o/oauth2/v2/auth?state={state}"
        ))
    }

    async fn exchange_code(&self, _code: &str) -> Result<GoogleIdentity, GoogleError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Identity(identity) => Ok(identity.clone()),
            MockOutcome::ExchangeFails => {
                Err(GoogleError::ExchangeFailed("invalid_grant".to_owned()))
            }
            MockOutcome::MissingIdToken => Err(GoogleError::IdTokenMissing),
        }
    }
}
