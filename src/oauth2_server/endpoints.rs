// ABOUTME: OAuth 2.0 authorization server implementing the code and refresh token grants
// ABOUTME: Handles client validation, code issuance, token minting, introspection and revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::models::{
    AuthorizationCode, AuthorizeRequest, IntrospectionResponse, OAuthError, StoredToken,
    TokenRequest, TokenResponse,
};
use crate::auth::{AuthManager, OAuthAccessClaims};
use crate::config::OAuthClientConfig;
use crate::constants::{
    credential_lengths,
    oauth::{GRANT_AUTHORIZATION_CODE, GRANT_REFRESH_TOKEN, RESPONSE_TYPE_CODE, TOKEN_TYPE_BEARER},
    token_lifetimes::AUTHORIZATION_CODE_MINUTES,
};
use crate::errors::AppResult;
use crate::store::TokenStore;
use crate::utils::random::generate_random_string;
use chrono::{Duration, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// OAuth 2.0 Authorization Server for the single registered client
#[derive(Clone)]
pub struct OAuth2AuthorizationServer {
    store: Arc<dyn TokenStore>,
    auth_manager: Arc<AuthManager>,
    client: OAuthClientConfig,
    access_token_ttl: Duration,
    code_lifetime: Duration,
}

impl OAuth2AuthorizationServer {
    /// Create a server issuing access tokens (and token records) valid for `access_token_ttl_secs`
    #[must_use]
    pub fn new(
        store: Arc<dyn TokenStore>,
        auth_manager: Arc<AuthManager>,
        client: OAuthClientConfig,
        access_token_ttl_secs: i64,
    ) -> Self {
        Self {
            store,
            auth_manager,
            client,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            code_lifetime: Duration::minutes(AUTHORIZATION_CODE_MINUTES),
        }
    }

    /// Override the authorization code lifetime
    #[must_use]
    pub fn with_code_lifetime(mut self, code_lifetime: Duration) -> Self {
        self.code_lifetime = code_lifetime;
        self
    }

    /// Handle an authorization request for an authenticated resource owner
    ///
    /// Returns the URL to redirect the user agent to, carrying the issued code and the
    /// caller's `state` when one was supplied.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedResponseType` unless `response_type=code`, `AccessDenied` when no
    /// principal is present, `InvalidClient` for an unknown client, `InvalidRequest` for a
    /// redirect URI that is not an absolute URL, or `ServerError` when the code cannot be stored.
    pub async fn authorize(
        &self,
        request: &AuthorizeRequest,
        user_id: Option<Uuid>,
    ) -> Result<String, OAuthError> {
        if request.response_type != RESPONSE_TYPE_CODE {
            return Err(OAuthError::UnsupportedResponseType);
        }

        let Some(user_id) = user_id else {
            warn!(client_id = %request.client_id, "Authorization request without authenticated user");
            return Err(OAuthError::AccessDenied);
        };

        if !self.is_registered_client(&request.client_id) {
            warn!(client_id = %request.client_id, "Authorization request for unknown client");
            return Err(OAuthError::InvalidClient);
        }

        let mut redirect = Url::parse(&request.redirect_uri).map_err(|e| {
            debug!(error = %e, "Rejected redirect_uri");
            OAuthError::InvalidRequest("redirect_uri must be an absolute URL".to_owned())
        })?;

        let code = self
            .generate_authorization_code(
                &request.client_id,
                &request.redirect_uri,
                request.scope.as_deref().unwrap_or_default(),
                user_id,
            )
            .await?;

        {
            let mut query = redirect.query_pairs_mut();
            query.append_pair("code", &code);
            if let Some(state) = request.state.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("state", state);
            }
        }

        info!(client_id = %request.client_id, %user_id, "Issued authorization code");
        Ok(redirect.into())
    }

    /// Handle a token request (`POST /oauth/token`)
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` for bad client credentials, `UnsupportedGrantType` for grants
    /// other than `authorization_code` and `refresh_token`, and the grant-specific failures
    /// of [`Self::exchange_code`] and [`Self::refresh_access_token`].
    pub async fn token(&self, request: TokenRequest) -> Result<TokenResponse, OAuthError> {
        self.validate_client(&request.client_id, &request.client_secret)?;

        match request.grant_type.as_str() {
            GRANT_AUTHORIZATION_CODE => {
                let code = request.code.filter(|c| !c.is_empty()).ok_or_else(|| {
                    OAuthError::InvalidGrant("missing code parameter".to_owned())
                })?;
                let redirect_uri = request.redirect_uri.unwrap_or_default();
                self.exchange_code(&code, &request.client_id, &redirect_uri)
                    .await
            }
            GRANT_REFRESH_TOKEN => {
                let refresh_token = request
                    .refresh_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        OAuthError::InvalidGrant("missing refresh_token parameter".to_owned())
                    })?;
                self.refresh_access_token(&refresh_token, &request.client_id)
                    .await
            }
            other => {
                debug!(grant_type = other, "Unsupported grant type");
                Err(OAuthError::UnsupportedGrantType)
            }
        }
    }

    /// Check client credentials against the registered client
    ///
    /// # Errors
    ///
    /// Returns `InvalidClient` when either value differs or no client is configured.
    pub fn validate_client(&self, client_id: &str, client_secret: &str) -> Result<(), OAuthError> {
        let id_matches = self.is_registered_client(client_id);
        let secret_matches: bool = client_secret
            .as_bytes()
            .ct_eq(self.client.client_secret.as_bytes())
            .into();

        if id_matches && secret_matches {
            Ok(())
        } else {
            warn!(%client_id, "Client authentication failed");
            Err(OAuthError::InvalidClient)
        }
    }

    /// Issue and persist a single-use authorization code
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if randomness or the store fails.
    pub async fn generate_authorization_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        user_id: Uuid,
    ) -> Result<String, OAuthError> {
        let code = generate_random_string(credential_lengths::AUTHORIZATION_CODE)?;

        let auth_code = AuthorizationCode {
            code: code.clone(),
            client_id: client_id.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
            scope: scope.to_owned(),
            user_id,
            expires_at: Utc::now() + self.code_lifetime,
        };

        self.store.store_code(&auth_code).await.map_err(|e| {
            error!(error = %e, %client_id, "Failed to store authorization code");
            OAuthError::ServerError(e)
        })?;

        Ok(code)
    }

    /// Redeem an authorization code for a token pair
    ///
    /// The code is consumed before any check, so a mismatched attempt burns it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCode` if the code is unknown, expired or already used, and
    /// `InvalidGrant` if it was issued to another client or redirect URI.
    pub async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let auth_code = self.store.take_code(code).await.map_err(|e| {
            error!(error = %e, "Failed to redeem authorization code");
            OAuthError::ServerError(e)
        })?;

        let Some(auth_code) = auth_code else {
            warn!(%client_id, "Authorization code unknown, expired or replayed");
            return Err(OAuthError::InvalidCode);
        };

        if auth_code.client_id != client_id {
            warn!(
                %client_id,
                issued_to = %auth_code.client_id,
                "Authorization code presented by a different client"
            );
            return Err(OAuthError::InvalidGrant("client_id mismatch".to_owned()));
        }

        if auth_code.redirect_uri != redirect_uri {
            warn!(%client_id, "Authorization code presented with a different redirect_uri");
            return Err(OAuthError::InvalidGrant("redirect_uri mismatch".to_owned()));
        }

        let response = self
            .generate_tokens(client_id, auth_code.user_id, &auth_code.scope)
            .await?;
        info!(%client_id, user_id = %auth_code.user_id, "Exchanged authorization code");
        Ok(response)
    }

    /// Rotate a refresh token: revoke its record and mint a new pair
    ///
    /// # Errors
    ///
    /// Returns `InvalidRefreshToken` if the token is unknown, expired, is an access token, or
    /// lost a concurrent rotation race, and `InvalidClient` if it belongs to another client.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let record = self.store.get_token(refresh_token).await.map_err(|e| {
            error!(error = %e, "Failed to look up refresh token");
            OAuthError::ServerError(e)
        })?;

        // Both credentials index the record; only the refresh half may be rotated
        let Some(record) = record.filter(|r| r.refresh_token == refresh_token) else {
            warn!(%client_id, "Refresh token unknown, expired or already rotated");
            return Err(OAuthError::InvalidRefreshToken);
        };

        if record.client_id != client_id {
            warn!(
                %client_id,
                issued_to = %record.client_id,
                "Refresh token presented by a different client"
            );
            return Err(OAuthError::InvalidClient);
        }

        let revoked = self.store.revoke_token(refresh_token).await.map_err(|e| {
            error!(error = %e, "Failed to revoke rotated refresh token");
            OAuthError::ServerError(e)
        })?;
        if !revoked {
            warn!(%client_id, "Refresh token rotated concurrently");
            return Err(OAuthError::InvalidRefreshToken);
        }

        let response = self
            .generate_tokens(client_id, record.user_id, &record.scope)
            .await?;
        info!(%client_id, user_id = %record.user_id, "Rotated refresh token");
        Ok(response)
    }

    /// Report whether `token` (access or refresh) is active
    ///
    /// Unknown, expired and revoked tokens are inactive, never an error.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` only if the store itself fails.
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResponse, OAuthError> {
        if token.is_empty() {
            return Ok(IntrospectionResponse::inactive());
        }

        let record = self.store.get_token(token).await.map_err(|e| {
            error!(error = %e, "Failed to look up token for introspection");
            OAuthError::ServerError(e)
        })?;

        Ok(record.map_or_else(IntrospectionResponse::inactive, |r| {
            IntrospectionResponse::active(&r)
        }))
    }

    /// Resolve an issued access token to the user it was granted for
    ///
    /// Goes through the store so revoked and expired tokens resolve to `None`. Refresh
    /// tokens never resolve.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store itself fails.
    pub async fn resolve_access_token(&self, token: &str) -> AppResult<Option<Uuid>> {
        if token.is_empty() {
            return Ok(None);
        }

        let record = self.store.get_token(token).await?;
        Ok(record
            .filter(|r| r.access_token == token)
            .map(|r| r.user_id))
    }

    /// Revoke the record `token` belongs to; revoking an absent token succeeds
    ///
    /// # Errors
    ///
    /// Returns `ServerError` only if the store itself fails.
    pub async fn revoke(&self, token: &str) -> Result<(), OAuthError> {
        if token.is_empty() {
            return Ok(());
        }

        let removed = self.store.revoke_token(token).await.map_err(|e| {
            error!(error = %e, "Failed to revoke token");
            OAuthError::ServerError(e)
        })?;

        debug!(removed, "Processed revocation request");
        Ok(())
    }

    /// Mint an access JWT and opaque refresh token sharing one record and expiry
    async fn generate_tokens(
        &self,
        client_id: &str,
        user_id: Uuid,
        scope: &str,
    ) -> Result<TokenResponse, OAuthError> {
        let now = Utc::now();
        let expires_at = now + self.access_token_ttl;

        let claims = OAuthAccessClaims {
            client_id: client_id.to_owned(),
            user_id,
            scope: scope.to_owned(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let access_token = self.auth_manager.generate_oauth_access_token(&claims)?;
        let refresh_token = generate_random_string(credential_lengths::OAUTH_REFRESH_TOKEN)?;

        let record = StoredToken {
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
            client_id: client_id.to_owned(),
            user_id,
            scope: scope.to_owned(),
            expires_at,
            created_at: now,
        };

        self.store.store_token(&record).await.map_err(|e| {
            error!(error = %e, %client_id, "Failed to store token record");
            OAuthError::ServerError(e)
        })?;

        Ok(TokenResponse {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_owned(),
            expires_in: self.access_token_ttl.num_seconds(),
            refresh_token: Some(refresh_token),
            scope: Some(record.scope).filter(|s| !s.is_empty()),
        })
    }

    /// An unconfigured client id never matches
    fn is_registered_client(&self, client_id: &str) -> bool {
        !self.client.client_id.is_empty()
            && bool::from(client_id.as_bytes().ct_eq(self.client.client_id.as_bytes()))
    }
}
