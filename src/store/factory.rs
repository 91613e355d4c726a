// ABOUTME: Token store factory for environment-based backend selection
// ABOUTME: Builds the in-memory or Redis store named by STORE_BACKEND
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{InMemoryTokenStore, RedisTokenStore, TokenStore};
use crate::config::{StoreBackend, StoreConfig};
use crate::errors::{AppError, AppResult};
use std::sync::Arc;

/// Create the token store selected by configuration
///
/// # Errors
///
/// Returns an error if Redis is selected without connection settings or cannot be reached.
pub async fn create_token_store(config: &StoreConfig) -> AppResult<Arc<dyn TokenStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!(
                "Initializing in-memory token store (max entries: {})",
                config.max_entries
            );
            Ok(Arc::new(InMemoryTokenStore::new(config)))
        }
        StoreBackend::Redis => {
            let redis_config = config.redis.as_ref().ok_or_else(|| {
                AppError::config("Redis connection settings are required for the Redis backend")
            })?;
            tracing::info!("Initializing Redis token store");
            Ok(Arc::new(RedisTokenStore::connect(redis_config).await?))
        }
    }
}
