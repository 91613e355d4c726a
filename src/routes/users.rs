// ABOUTME: Protected user routes behind the bearer authentication gate
// ABOUTME: Returns the profile of the authenticated account
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{ApiResponse, AppError};
use crate::middleware::{require_auth, AuthenticatedUser};
use crate::resources::ServerResources;
use crate::users::UserLookup;
use axum::{
    extract::State,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use std::sync::Arc;

/// Routes for the authenticated user
pub struct UserRoutes;

impl UserRoutes {
    /// Create user routes, all protected by [`require_auth`]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/users/profile", get(Self::handle_profile))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&resources),
                require_auth,
            ))
            .with_state(resources)
    }

    async fn handle_profile(
        State(resources): State<Arc<ServerResources>>,
        Extension(auth): Extension<AuthenticatedUser>,
    ) -> Result<Response, AppError> {
        match resources.users.find_by_id(auth.user_id).await {
            UserLookup::Found(user) => Ok(Json(ApiResponse::ok(user)).into_response()),
            UserLookup::NotFound => Err(AppError::not_found("User")),
            UserLookup::Error(e) => Err(e),
        }
    }
}
