// ABOUTME: Integration tests for the Google OAuth client against a local stub of Google's endpoints
// ABOUTME: Covers ID token audience and issuer checks and token endpoint failure mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use common::create_test_resources_with_google;
use kinance_auth_server::config::GoogleConfig;
use kinance_auth_server::constants::error_messages;
use kinance_auth_server::errors::{AppError, ErrorCode};
use kinance_auth_server::oauth2_client::{GoogleError, GoogleIdentityProvider, GoogleOAuthClient};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

const GOOGLE_CLIENT_ID: &str = "kinance-google-client";

/// Canned responses served by the stub
#[derive(Clone)]
struct StubGoogle {
    token_status: StatusCode,
    token_body: Value,
    tokeninfo: Value,
}

impl StubGoogle {
    fn issuing(tokeninfo: Value) -> Self {
        Self {
            token_status: StatusCode::OK,
            token_body: json!({"access_token": "ya29.stub", "id_token": "stub.id.token"}),
            tokeninfo,
        }
    }
}

fn tokeninfo(aud: &str, iss: &str) -> Value {
    json!({
        "aud": aud,
        "iss": iss,
        "email": "grace@kinance.io",
        "email_verified": "true",
        "given_name": "Grace",
        "family_name": "Hopper",
        "hd": "kinance.io"
    })
}

async fn token_endpoint(State(stub): State<StubGoogle>) -> (StatusCode, Json<Value>) {
    (stub.token_status, Json(stub.token_body))
}

async fn tokeninfo_endpoint(State(stub): State<StubGoogle>) -> Json<Value> {
    Json(stub.tokeninfo)
}

/// Serve the stub on an ephemeral port and return a client pointed at it
async fn client_against(stub: StubGoogle) -> GoogleOAuthClient {
    let app = Router::new()
        .route("/token", post(token_endpoint))
        .route("/tokeninfo", get(tokeninfo_endpoint))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GoogleConfig {
        client_id: Some(GOOGLE_CLIENT_ID.to_owned()),
        client_secret: Some("google-secret".to_owned()),
        redirect_url: Some("https://api.kinance.test/api/v1/auth/google/callback".to_owned()),
        allowed_hd: None,
    };
    GoogleOAuthClient::from_config(&config)
        .expect("configured client")
        .with_endpoints(&format!("{base}/token"), &format!("{base}/tokeninfo"))
}

#[tokio::test]
async fn test_exchange_returns_verified_identity() -> Result<()> {
    let client = client_against(StubGoogle::issuing(tokeninfo(
        GOOGLE_CLIENT_ID,
        "https://accounts.google.com",
    )))
    .await;

    let identity = client.exchange_code("auth-code").await?;
    assert_eq!(identity.email, "grace@kinance.io");
    assert!(identity.email_verified);
    assert_eq!(identity.given_name, "Grace");
    assert_eq!(identity.hd.as_deref(), Some("kinance.io"));
    Ok(())
}

#[tokio::test]
async fn test_foreign_audience_is_rejected() {
    let client = client_against(StubGoogle::issuing(tokeninfo(
        "someone-elses-client",
        "https://accounts.google.com",
    )))
    .await;

    let error = client.exchange_code("auth-code").await.unwrap_err();
    assert!(matches!(error, GoogleError::IdTokenInvalid(_)));

    let error = AppError::from(error);
    assert_eq!(error.code, ErrorCode::AuthInvalid);
    assert_eq!(error.http_status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error.message, error_messages::ID_TOKEN_INVALID);
}

#[tokio::test]
async fn test_unexpected_issuer_is_rejected() {
    let client = client_against(StubGoogle::issuing(tokeninfo(
        GOOGLE_CLIENT_ID,
        "https://login.example.com",
    )))
    .await;

    let error = client.exchange_code("auth-code").await.unwrap_err();
    assert!(matches!(error, GoogleError::IdTokenInvalid(_)));
}

#[tokio::test]
async fn test_missing_id_token_is_bad_request() {
    let client = client_against(StubGoogle {
        token_status: StatusCode::OK,
        token_body: json!({"access_token": "ya29.stub"}),
        tokeninfo: tokeninfo(GOOGLE_CLIENT_ID, "accounts.google.com"),
    })
    .await;

    let error = AppError::from(client.exchange_code("auth-code").await.unwrap_err());
    assert_eq!(error.code, ErrorCode::InvalidInput);
    assert_eq!(error.http_status(), StatusCode::BAD_REQUEST);
    assert_eq!(error.message, error_messages::ID_TOKEN_MISSING);
}

#[tokio::test]
async fn test_rejected_code_is_exchange_failure() {
    let client = client_against(StubGoogle {
        token_status: StatusCode::BAD_REQUEST,
        token_body: json!({"error": "invalid_grant"}),
        tokeninfo: tokeninfo(GOOGLE_CLIENT_ID, "accounts.google.com"),
    })
    .await;

    let error = client.exchange_code("expired-code").await.unwrap_err();
    assert!(matches!(error, GoogleError::ExchangeFailed(_)));

    let error = AppError::from(error);
    assert_eq!(error.http_status(), StatusCode::BAD_REQUEST);
    assert_eq!(error.message, error_messages::CODE_EXCHANGE_FAILED);
}

#[tokio::test]
async fn test_callback_through_real_client() -> Result<()> {
    let client = client_against(StubGoogle::issuing(tokeninfo(
        GOOGLE_CLIENT_ID,
        "accounts.google.com",
    )))
    .await;
    let resources = create_test_resources_with_google(Arc::new(client));

    let consent = Url::parse(&resources.google_login.login().await?)?;
    assert_eq!(consent.host_str(), Some("accounts.google.com"));
    let state = consent
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .expect("state in consent URL");

    let response = resources
        .google_login
        .callback(Some(&state), Some("auth-code"))
        .await?;
    assert_eq!(response.user.email, "grace@kinance.io");
    assert!(!response.user.has_password());
    Ok(())
}
