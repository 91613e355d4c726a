// ABOUTME: Google OAuth2 client for federated login
// ABOUTME: Builds the consent URL, exchanges codes and verifies the returned ID token
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::GoogleConfig;
use crate::constants::{error_messages, google};
use crate::errors::{AppError, AppResult};
use crate::utils::http_client::oauth_client;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Verified identity asserted by Google
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Account email
    pub email: String,
    /// Whether Google verified the email
    pub email_verified: bool,
    /// First name
    pub given_name: String,
    /// Last name
    pub family_name: String,
    /// Workspace hosted domain, absent for consumer accounts
    pub hd: Option<String>,
}

/// Failures of the code exchange and ID token verification
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Token endpoint rejected the code or was unreachable
    #[error("code exchange failed: {0}")]
    ExchangeFailed(String),
    /// Token response carried no `id_token`
    #[error("token response has no id_token")]
    IdTokenMissing,
    /// ID token failed verification
    #[error("id_token rejected: {0}")]
    IdTokenInvalid(String),
}

impl From<GoogleError> for AppError {
    fn from(error: GoogleError) -> Self {
        let mapped = match &error {
            GoogleError::ExchangeFailed(_) => {
                Self::invalid_input(error_messages::CODE_EXCHANGE_FAILED)
            }
            GoogleError::IdTokenMissing => Self::invalid_input(error_messages::ID_TOKEN_MISSING),
            GoogleError::IdTokenInvalid(_) => Self::auth_invalid(error_messages::ID_TOKEN_INVALID),
        };
        mapped.with_source(error)
    }
}

/// Identity provider seam for federated login
#[async_trait]
pub trait GoogleIdentityProvider: Send + Sync {
    /// Consent URL carrying `state`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    fn authorization_url(&self, state: &str) -> AppResult<String>;

    /// Exchange an authorization code for a verified identity
    async fn exchange_code(&self, code: &str) -> Result<GoogleIdentity, GoogleError>;
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

/// Claims returned by the `tokeninfo` endpoint
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    #[serde(default)]
    email: String,
    #[serde(default, deserialize_with = "bool_or_string")]
    email_verified: bool,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    hd: Option<String>,
}

/// `tokeninfo` renders booleans as strings
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(text) => text.eq_ignore_ascii_case("true"),
    })
}

/// Google OAuth2 client
#[derive(Clone)]
pub struct GoogleOAuthClient {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    token_url: String,
    tokeninfo_url: String,
    http: reqwest::Client,
}

impl GoogleOAuthClient {
    /// Build a client from configuration, or `None` when Google login is not configured
    #[must_use]
    pub fn from_config(config: &GoogleConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }

        Some(Self {
            client_id: config.client_id.clone().unwrap_or_default(),
            client_secret: config.client_secret.clone().unwrap_or_default(),
            redirect_url: config.redirect_url.clone().unwrap_or_default(),
            token_url: google::TOKEN_URL.to_owned(),
            tokeninfo_url: google::TOKENINFO_URL.to_owned(),
            http: oauth_client(),
        })
    }

    /// Point the client at different token and tokeninfo endpoints
    #[must_use]
    pub fn with_endpoints(mut self, token_url: &str, tokeninfo_url: &str) -> Self {
        token_url.clone_into(&mut self.token_url);
        tokeninfo_url.clone_into(&mut self.tokeninfo_url);
        self
    }

    async fn fetch_id_token(&self, code: &str) -> Result<String, GoogleError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_url.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GoogleError::ExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Google token endpoint rejected authorization code");
            return Err(GoogleError::ExchangeFailed(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| GoogleError::ExchangeFailed(e.to_string()))?;

        body.id_token
            .filter(|t| !t.is_empty())
            .ok_or(GoogleError::IdTokenMissing)
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<TokenInfo, GoogleError> {
        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| GoogleError::IdTokenInvalid(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GoogleError::IdTokenInvalid(format!(
                "tokeninfo returned {status}"
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| GoogleError::IdTokenInvalid(e.to_string()))?;

        if info.aud != self.client_id {
            return Err(GoogleError::IdTokenInvalid("audience mismatch".to_owned()));
        }
        if !google::ISSUERS.contains(&info.iss.as_str()) {
            return Err(GoogleError::IdTokenInvalid(format!(
                "unexpected issuer {}",
                info.iss
            )));
        }

        Ok(info)
    }
}

#[async_trait]
impl GoogleIdentityProvider for GoogleOAuthClient {
    fn authorization_url(&self, state: &str) -> AppResult<String> {
        let mut url = Url::parse(google::AUTH_URL)
            .map_err(|e| AppError::internal(format!("Invalid Google auth URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &google::SCOPES.join(" "))
            .append_pair("access_type", google::ACCESS_TYPE)
            .append_pair("prompt", google::PROMPT)
            .append_pair("state", state);

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<GoogleIdentity, GoogleError> {
        let id_token = self.fetch_id_token(code).await?;
        let info = self.verify_id_token(&id_token).await?;
        debug!(hd = ?info.hd, "Verified Google ID token");

        Ok(GoogleIdentity {
            email: info.email,
            email_verified: info.email_verified,
            given_name: info.given_name,
            family_name: info.family_name,
            hd: info.hd,
        })
    }
}
