// ABOUTME: OAuth2 client side: federated Google login
// ABOUTME: Identity provider client and the login flow that maps identities to local users
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Google OAuth2 client and identity provider seam
pub mod client;
/// Federated login flow
pub mod flow_manager;

pub use client::{GoogleError, GoogleIdentity, GoogleIdentityProvider, GoogleOAuthClient};
pub use flow_manager::GoogleLoginService;
