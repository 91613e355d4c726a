// ABOUTME: OAuth 2.0 HTTP route handlers for the authorization server
// ABOUTME: Authorize redirect, form-encoded token exchange, introspection and revocation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::models::{AuthorizeRequest, IntrospectRequest, OAuthError, RevokeRequest, TokenRequest};
use crate::resources::ServerResources;
use crate::utils::auth::extract_bearer_token;
use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use uuid::Uuid;

/// OAuth 2.0 authorization server routes
pub struct OAuth2Routes;

impl OAuth2Routes {
    /// Create all OAuth 2.0 routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        // RFC 6749 section 5.1: token responses must not be cached
        let token_route = Router::new()
            .route("/oauth/token", post(Self::handle_token))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::PRAGMA,
                HeaderValue::from_static("no-cache"),
            ));

        Router::new()
            .route("/oauth/authorize", get(Self::handle_authorize))
            .route("/oauth/introspect", post(Self::handle_introspect))
            .route("/oauth/revoke", post(Self::handle_revoke))
            .merge(token_route)
            .with_state(resources)
    }

    async fn handle_authorize(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        query: Result<Query<AuthorizeRequest>, QueryRejection>,
    ) -> Result<Response, OAuthError> {
        let Query(request) = query?;
        let user_id = Self::resource_owner(&resources, &headers);
        let location = resources.oauth_server.authorize(&request, user_id).await?;
        Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
    }

    async fn handle_token(
        State(resources): State<Arc<ServerResources>>,
        form: Result<Form<TokenRequest>, FormRejection>,
    ) -> Result<Response, OAuthError> {
        let Form(request) = form?;
        let response = resources.oauth_server.token(request).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_introspect(
        State(resources): State<Arc<ServerResources>>,
        form: Result<Form<IntrospectRequest>, FormRejection>,
    ) -> Result<Response, OAuthError> {
        let Form(request) = form?;
        let response = resources.oauth_server.introspect(&request.token).await?;
        Ok((StatusCode::OK, Json(response)).into_response())
    }

    async fn handle_revoke(
        State(resources): State<Arc<ServerResources>>,
        form: Result<Form<RevokeRequest>, FormRejection>,
    ) -> Result<Response, OAuthError> {
        let Form(request) = form?;
        resources
            .oauth_server
            .validate_client(&request.client_id, &request.client_secret)?;
        resources.oauth_server.revoke(&request.token).await?;
        Ok(StatusCode::OK.into_response())
    }

    /// Resolve the signed-in user from a primary access token, if any
    fn resource_owner(resources: &ServerResources, headers: &HeaderMap) -> Option<Uuid> {
        let auth_header = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        let token = extract_bearer_token(auth_header).ok()?;

        match resources.auth_service.validate_token(token) {
            Ok(user_id) => Some(user_id),
            Err(e) => {
                tracing::debug!(error = %e, "Authorization request carried an unusable token");
                None
            }
        }
    }
}
