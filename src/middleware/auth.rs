// ABOUTME: Bearer authentication gate for protected routes
// ABOUTME: Accepts primary access tokens or stored OAuth access tokens and injects the user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::error_messages;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::utils::auth::{extract_bearer_token, BearerError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Principal resolved by [`require_auth`], read by handlers via `Extension<AuthenticatedUser>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Authenticated user
    pub user_id: Uuid,
}

/// Reject requests without a valid primary access token or live OAuth access token
///
/// ```rust,no_run
/// use axum::{middleware, routing::get, Router};
/// use kinance_auth_server::middleware::require_auth;
/// use kinance_auth_server::resources::ServerResources;
/// use std::sync::Arc;
///
/// # async fn handler() -> &'static str { "" }
/// # fn example(resources: Arc<ServerResources>) {
/// let app: Router = Router::new()
///     .route("/users/profile", get(handler))
///     .layer(middleware::from_fn_with_state(resources, require_auth));
/// # }
/// ```
#[tracing::instrument(skip_all, fields(user_id = tracing::field::Empty))]
pub async fn require_auth(
    State(resources): State<Arc<ServerResources>>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match extract_bearer_token(auth_header) {
        Ok(token) => token,
        Err(BearerError::Missing) => {
            debug!("Rejected request without Authorization header");
            return AppError::auth_required(error_messages::AUTH_HEADER_REQUIRED).into_response();
        }
        Err(BearerError::Malformed) => {
            debug!("Rejected request with non-bearer Authorization header");
            return AppError::auth_invalid(error_messages::INVALID_TOKEN).into_response();
        }
    };

    let user_id = match resources.auth_service.validate_token(token) {
        Ok(user_id) => user_id,
        Err(jwt_error) => match resources.oauth_server.resolve_access_token(token).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                warn!(error = %jwt_error, "Bearer token rejected");
                return AppError::auth_invalid(error_messages::INVALID_TOKEN).into_response();
            }
            Err(e) => return e.into_response(),
        },
    };

    tracing::Span::current().record("user_id", user_id.to_string());
    req.extensions_mut().insert(AuthenticatedUser { user_id });

    next.run(req).await
}
