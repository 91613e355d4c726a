// ABOUTME: Route module organization for the authorization server HTTP endpoints
// ABOUTME: Assembles the versioned API router with tracing and CORS layers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the Kinance authorization server
//!
//! Each domain module contains only route definitions and thin handlers that delegate to
//! the services held in [`ServerResources`].

/// Password authentication routes and service
pub mod auth;
/// Google federated login routes
pub mod google;
/// Health check and readiness routes
pub mod health;
/// Protected user routes
pub mod users;

pub use auth::{AuthRoutes, AuthService};
pub use google::GoogleRoutes;
pub use health::HealthRoutes;
pub use users::UserRoutes;

use crate::constants::service_names::API_V1_PREFIX;
use crate::middleware::setup_cors;
use crate::oauth2_server::OAuth2Routes;
use crate::resources::ServerResources;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the complete application router
///
/// Health probes are unprefixed; everything else lives under `/api/v1`.
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    let api = Router::new()
        .merge(AuthRoutes::routes(Arc::clone(resources)))
        .merge(GoogleRoutes::routes(Arc::clone(resources)))
        .merge(OAuth2Routes::routes(Arc::clone(resources)))
        .merge(UserRoutes::routes(Arc::clone(resources)));

    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(resources)))
        .nest(API_V1_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(setup_cors(&resources.config.cors))
}
