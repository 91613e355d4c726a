// ABOUTME: Main library entry point for the Kinance authorization server
// ABOUTME: Password login, OAuth 2.0 code/refresh grants, Google sign-in and the bearer gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Kinance Auth Server
//!
//! Authentication and authorization core of the Kinance family finance API.
//!
//! ## Features
//!
//! - **Password login**: registration, login and refresh issuing HS256 JWT pairs
//! - **`OAuth2` authorization server**: authorization code and refresh token grants with
//!   single-use codes, refresh rotation, introspection and revocation
//! - **Google sign-in**: state-protected redirect flow that provisions local accounts
//! - **Bearer gate**: middleware resolving `Authorization: Bearer` tokens to a user id
//!
//! ## Architecture
//!
//! - **Store**: TTL-bound token/code/state storage (in-memory LRU or Redis)
//! - **Users**: credential store (SQLite or in-memory)
//! - **Routes**: thin axum handlers over the services in [`resources::ServerResources`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kinance_auth_server::config::ServerConfig;
//! use kinance_auth_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Kinance auth server will bind {}", config.bind_address());
//!     Ok(())
//! }
//! ```

/// JWT signing and validation
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// Protocol constants and defaults
pub mod constants;

/// Unified error handling
pub mod errors;

/// Structured logging setup
pub mod logging;

/// HTTP middleware (bearer gate, CORS)
pub mod middleware;

/// User domain model
pub mod models;

/// Google federated login
pub mod oauth2_client;

/// `OAuth2` authorization server
pub mod oauth2_server;

/// Shared service container
pub mod resources;

/// HTTP routes
pub mod routes;

/// Token/code/state store
pub mod store;

/// Credential store
pub mod users;

/// Shared helpers
pub mod utils;
