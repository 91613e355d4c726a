// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Exposes the environment-driven ServerConfig and its typed sub-configurations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the Kinance authorization server
//!
//! All settings come from environment variables (optionally seeded from a `.env` file).
//! See [`environment::ServerConfig::from_env`] for the full variable list.

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AuthConfig, CorsConfig, DatabaseConfig, Environment, GoogleConfig, LogLevel,
    OAuthClientConfig, RedisConnectionConfig, ServerConfig, StoreBackend, StoreConfig,
};
