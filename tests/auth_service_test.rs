// ABOUTME: Integration tests for password registration, login and primary token refresh
// ABOUTME: Verifies validation rules, uniform login failures and refresh subject binding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use common::{create_test_resources, register_user, registration, TEST_PASSWORD};
use kinance_auth_server::constants::error_messages;
use kinance_auth_server::errors::ErrorCode;
use kinance_auth_server::models::{NewUser, UserRole};
use kinance_auth_server::routes::auth::{LoginRequest, RefreshTokenRequest};

fn login(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_owned(),
        password: password.to_owned(),
    }
}

#[tokio::test]
async fn test_register_returns_user_and_valid_token() -> Result<()> {
    let resources = create_test_resources();
    let response = resources
        .auth_service
        .register(registration("  Parent@Family.ORG "))
        .await?;

    assert_eq!(response.user.email, "parent@family.org");
    assert_eq!(response.user.role, UserRole::default());
    assert!(response.user.is_active);
    assert!(response.user.has_password());
    assert_eq!(
        resources.auth_service.validate_token(&response.token)?,
        response.user.id
    );
    Ok(())
}

#[tokio::test]
async fn test_registered_user_never_serializes_hash() -> Result<()> {
    let resources = create_test_resources();
    let user = register_user(&resources, "parent@family.org").await?;

    let json = serde_json::to_value(&user)?;
    assert!(json.get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn test_register_validation_messages() -> Result<()> {
    let resources = create_test_resources();
    let service = &resources.auth_service;

    let mut bad_email = registration("not-an-email");
    bad_email.email = "not-an-email".to_owned();
    let error = service.register(bad_email).await.unwrap_err();
    assert_eq!(error.message, error_messages::INVALID_EMAIL_FORMAT);

    let mut short = registration("short@family.org");
    short.password = "1234567".to_owned();
    short.confirm_password = "1234567".to_owned();
    let error = service.register(short).await.unwrap_err();
    assert_eq!(error.message, error_messages::PASSWORD_TOO_SHORT);

    let mut mismatch = registration("mismatch@family.org");
    mismatch.confirm_password = "something-else".to_owned();
    let error = service.register(mismatch).await.unwrap_err();
    assert_eq!(error.message, error_messages::PASSWORDS_DO_NOT_MATCH);
    assert_eq!(error.code, ErrorCode::InvalidInput);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_case_insensitively() -> Result<()> {
    let resources = create_test_resources();
    register_user(&resources, "parent@family.org").await?;

    let error = resources
        .auth_service
        .register(registration("PARENT@family.org"))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::EMAIL_ALREADY_REGISTERED);
    Ok(())
}

#[tokio::test]
async fn test_login_issues_pair() -> Result<()> {
    let resources = create_test_resources();
    let user = register_user(&resources, "parent@family.org").await?;

    let response = resources
        .auth_service
        .login(login("Parent@Family.org", TEST_PASSWORD))
        .await?;
    assert_eq!(response.user.id, user.id);
    assert_eq!(response.expires_in, 3600);
    assert_eq!(
        resources.auth_service.validate_token(&response.access_token)?,
        user.id
    );

    // The refresh token is not accepted where an access token is expected
    assert!(resources
        .auth_service
        .validate_token(&response.refresh_token)
        .is_err());
    Ok(())
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() -> Result<()> {
    let resources = create_test_resources();
    register_user(&resources, "parent@family.org").await?;

    let wrong_password = resources
        .auth_service
        .login(login("parent@family.org", "wrong-password"))
        .await
        .unwrap_err();
    let unknown_email = resources
        .auth_service
        .login(login("nobody@family.org", TEST_PASSWORD))
        .await
        .unwrap_err();

    assert_eq!(wrong_password.code, ErrorCode::AuthInvalid);
    assert_eq!(wrong_password.code, unknown_email.code);
    assert_eq!(wrong_password.message, unknown_email.message);
    assert_eq!(wrong_password.message, error_messages::INVALID_CREDENTIALS);
    Ok(())
}

#[tokio::test]
async fn test_passwordless_account_cannot_log_in() -> Result<()> {
    let resources = create_test_resources();
    resources
        .users
        .create(NewUser {
            email: "federated@family.org".to_owned(),
            password_hash: None,
            first_name: "Fed".to_owned(),
            last_name: "Erated".to_owned(),
            phone: None,
            role: UserRole::default(),
        })
        .await?;

    let error = resources
        .auth_service
        .login(login("federated@family.org", ""))
        .await
        .unwrap_err();
    assert_eq!(error.message, error_messages::INVALID_CREDENTIALS);
    Ok(())
}

#[tokio::test]
async fn test_refresh_requires_matching_subject() -> Result<()> {
    let resources = create_test_resources();
    let user = register_user(&resources, "parent@family.org").await?;
    let other = register_user(&resources, "child@family.org").await?;
    let pair = resources
        .auth_service
        .login(login("parent@family.org", TEST_PASSWORD))
        .await?;

    let refreshed = resources
        .auth_service
        .refresh_token(RefreshTokenRequest {
            user_id: user.id.to_string(),
            refresh_token: pair.refresh_token.clone(),
        })
        .await?;
    assert_eq!(refreshed.user.id, user.id);

    let error = resources
        .auth_service
        .refresh_token(RefreshTokenRequest {
            user_id: other.id.to_string(),
            refresh_token: pair.refresh_token,
        })
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::AuthInvalid);
    Ok(())
}

#[tokio::test]
async fn test_access_token_is_not_a_refresh_token() -> Result<()> {
    let resources = create_test_resources();
    let user = register_user(&resources, "parent@family.org").await?;
    let pair = resources
        .auth_service
        .login(login("parent@family.org", TEST_PASSWORD))
        .await?;

    let error = resources
        .auth_service
        .refresh_token(RefreshTokenRequest {
            user_id: user.id.to_string(),
            refresh_token: pair.access_token,
        })
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::AuthInvalid);
    Ok(())
}
