// ABOUTME: Integration tests for the Google federated login flow
// ABOUTME: Uses a mock identity provider to cover state handling, identity checks and upsert
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{
    create_test_resources, create_test_resources_with, create_test_resources_with_google,
    register_user, test_config, MockGoogleProvider, MockOutcome,
};
use kinance_auth_server::constants::error_messages;
use kinance_auth_server::errors::{AppResult, ErrorCode};
use kinance_auth_server::models::{NewUser, User, UserRole};
use kinance_auth_server::oauth2_client::GoogleIdentity;
use kinance_auth_server::resources::ServerResources;
use kinance_auth_server::store::InMemoryTokenStore;
use kinance_auth_server::users::{InMemoryUserRepository, UserLookup, UserRepository};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

/// Repository whose first email lookup misses, as if another login created the account
/// between this login's lookup and its insert
struct StaleFirstLookup {
    inner: InMemoryUserRepository,
    missed: AtomicBool,
}

#[async_trait]
impl UserRepository for StaleFirstLookup {
    async fn find_by_email(&self, email: &str) -> UserLookup {
        if !self.missed.swap(true, Ordering::SeqCst) {
            return UserLookup::NotFound;
        }
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: Uuid) -> UserLookup {
        self.inner.find_by_id(id).await
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        self.inner.create(new_user).await
    }
}

/// Start a login and pull the issued state out of the consent URL
async fn start_login(resources: &ServerResources) -> Result<String> {
    let consent = Url::parse(&resources.google_login.login().await?)?;
    let state = consent
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state in consent URL");
    Ok(state)
}

#[tokio::test]
async fn test_callback_creates_passwordless_account() -> Result<()> {
    let provider = MockGoogleProvider::verified("Grace@Kinance.io", None);
    let resources = create_test_resources_with_google(provider.clone());

    let state = start_login(&resources).await?;
    assert_eq!(state.len(), 32);

    let response = resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await?;
    assert_eq!(response.user.email, "grace@kinance.io");
    assert_eq!(response.user.first_name, "Grace");
    assert!(!response.user.has_password());
    assert_eq!(
        resources.auth_service.validate_token(&response.access_token)?,
        response.user.id
    );
    assert_eq!(provider.exchanges(), 1);
    Ok(())
}

#[tokio::test]
async fn test_callback_reuses_existing_account() -> Result<()> {
    let resources =
        create_test_resources_with_google(MockGoogleProvider::verified("parent@family.org", None));
    let existing = register_user(&resources, "parent@family.org").await?;

    let state = start_login(&resources).await?;
    let response = resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await?;
    assert_eq!(response.user.id, existing.id);
    assert!(response.user.has_password());
    Ok(())
}

#[tokio::test]
async fn test_state_is_single_use() -> Result<()> {
    let provider = MockGoogleProvider::verified("grace@kinance.io", None);
    let resources = create_test_resources_with_google(provider.clone());
    let state = start_login(&resources).await?;

    resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await?;
    let replay = resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await
        .unwrap_err();
    assert_eq!(replay.message, error_messages::INVALID_STATE);
    assert_eq!(replay.code, ErrorCode::InvalidInput);

    // The replay never reached the provider
    assert_eq!(provider.exchanges(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_parameters() -> Result<()> {
    let provider = MockGoogleProvider::verified("grace@kinance.io", None);
    let resources = create_test_resources_with_google(provider.clone());
    let service = &resources.google_login;

    for (state, code) in [(None, Some("code")), (Some("state"), None), (Some(""), Some(""))] {
        let error = service.callback(state, code).await.unwrap_err();
        assert_eq!(error.message, error_messages::MISSING_STATE_OR_CODE);
    }

    let error = service
        .callback(Some("never-issued"), Some("code"))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::INVALID_STATE);
    assert_eq!(provider.exchanges(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unverified_email_is_rejected() -> Result<()> {
    let resources = create_test_resources_with_google(MockGoogleProvider::new(
        MockOutcome::Identity(GoogleIdentity {
            email: "grace@kinance.io".to_owned(),
            email_verified: false,
            ..GoogleIdentity::default()
        }),
    ));
    let state = start_login(&resources).await?;

    let error = resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::EMAIL_NOT_VERIFIED);
    assert_eq!(error.code, ErrorCode::AuthInvalid);
    assert!(matches!(
        resources.users.find_by_email("grace@kinance.io").await,
        UserLookup::NotFound
    ));
    Ok(())
}

#[tokio::test]
async fn test_hosted_domain_restriction() -> Result<()> {
    let mut config = test_config();
    config.google.allowed_hd = Some("kinance.io".to_owned());

    let outsider = create_test_resources_with(
        config.clone(),
        Some(MockGoogleProvider::verified("someone@gmail.com", None)),
    );
    let state = start_login(&outsider).await?;
    let error = outsider
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::UNAUTHORIZED_DOMAIN);

    let insider = create_test_resources_with(
        config,
        Some(MockGoogleProvider::verified(
            "grace@kinance.io",
            Some("kinance.io"),
        )),
    );
    let state = start_login(&insider).await?;
    insider
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_provider_failures_map_to_client_errors() -> Result<()> {
    let failing = create_test_resources_with_google(MockGoogleProvider::new(
        MockOutcome::ExchangeFails,
    ));
    let state = start_login(&failing).await?;
    let error = failing
        .google_login
        .callback(Some(&state), Some("bad-code"))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::CODE_EXCHANGE_FAILED);
    assert_eq!(error.code, ErrorCode::InvalidInput);

    let no_id_token = create_test_resources_with_google(MockGoogleProvider::new(
        MockOutcome::MissingIdToken,
    ));
    let state = start_login(&no_id_token).await?;
    let error = no_id_token
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::ID_TOKEN_MISSING);
    Ok(())
}

#[tokio::test]
async fn test_inactive_account_is_refused() -> Result<()> {
    let config = test_config();
    let users = Arc::new(InMemoryUserRepository::new());
    let store = Arc::new(InMemoryTokenStore::new(&config.store));
    let resources = ServerResources::new(
        Arc::new(config),
        users.clone(),
        store,
        Some(MockGoogleProvider::verified("parent@family.org", None)),
    );

    let mut user = register_user(&resources, "parent@family.org").await?;
    user.is_active = false;
    users.update(user);

    let state = start_login(&resources).await?;
    let error = resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::AuthInvalid);
    Ok(())
}

#[tokio::test]
async fn test_login_without_configuration() -> Result<()> {
    let resources = create_test_resources();

    let error = resources.google_login.login().await.unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigMissing);
    assert_eq!(error.message, error_messages::GOOGLE_MISCONFIGURED);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_first_login_adopts_existing_account() -> Result<()> {
    let config = test_config();
    let inner = InMemoryUserRepository::new();
    let existing = inner
        .create(NewUser {
            email: "grace@kinance.io".to_owned(),
            password_hash: None,
            first_name: "Grace".to_owned(),
            last_name: "Hopper".to_owned(),
            phone: None,
            role: UserRole::default(),
        })
        .await?;
    let users = Arc::new(StaleFirstLookup {
        inner,
        missed: AtomicBool::new(false),
    });
    let store = Arc::new(InMemoryTokenStore::new(&config.store));
    let resources = ServerResources::new(
        Arc::new(config),
        users,
        store,
        Some(MockGoogleProvider::verified("grace@kinance.io", None)),
    );

    let state = start_login(&resources).await?;
    let response = resources
        .google_login
        .callback(Some(&state), Some("google-code"))
        .await?;
    assert_eq!(response.user.id, existing.id);
    Ok(())
}
