// ABOUTME: Google federated login route handlers
// ABOUTME: Redirects to the consent screen and completes the callback with primary JWTs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::errors::{ApiResponse, AppError};
use crate::resources::ServerResources;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters Google appends to the callback
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct GoogleCallbackQuery {
    /// State issued by the login route
    pub state: Option<String>,
    /// Authorization code
    pub code: Option<String>,
}

/// Google login routes
pub struct GoogleRoutes;

impl GoogleRoutes {
    /// Create the login and callback routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/google/login", get(Self::handle_login))
            .route("/auth/google/callback", get(Self::handle_callback))
            .with_state(resources)
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let url = resources.google_login.login().await?;
        Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
    }

    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<GoogleCallbackQuery>,
    ) -> Result<Response, AppError> {
        let response = resources
            .google_login
            .callback(query.state.as_deref(), query.code.as_deref())
            .await?;
        Ok(Json(ApiResponse::ok_with_message(response, "Login successful")).into_response())
    }
}
