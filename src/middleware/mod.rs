// ABOUTME: HTTP middleware for bearer authentication and cross-origin access
// ABOUTME: The auth gate is the single enforcement point for protected routes

pub mod auth;
pub mod cors;

// Authentication middleware
pub use auth::{require_auth, AuthenticatedUser};

// CORS configuration
pub use cors::setup_cors;
