// ABOUTME: Redis token store with connection management and TTL support
// ABOUTME: Shares tokens, codes and login state across server instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{code_key, state_key, token_key, ttl_until, TokenStore};
use crate::config::RedisConnectionConfig;
use crate::constants::store_keys::STATE_MARKER;
use crate::errors::{AppError, AppResult};
use crate::oauth2_server::models::{AuthorizationCode, StoredToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, RedisError};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, info, warn};

/// Redis token store
///
/// Uses `ConnectionManager` for automatic reconnection. Multi-key writes and deletes run
/// as `MULTI/EXEC` pipelines; single-use values are consumed with `GETDEL` and `DEL`, whose
/// replies tell exactly one caller that it won.
#[derive(Clone)]
pub struct RedisTokenStore {
    manager: ConnectionManager,
}

impl RedisTokenStore {
    /// Connect to Redis, retrying with exponential backoff
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or every connection attempt fails.
    pub async fn connect(config: &RedisConnectionConfig) -> AppResult<Self> {
        info!(
            "Connecting to Redis token store (timeout={}s, response_timeout={}s, retries={})",
            config.connection_timeout_secs,
            config.response_timeout_secs,
            config.initial_connection_retries
        );

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| AppError::config(format!("Invalid Redis URL: {e}")))?;

        let manager = Self::connect_with_retry(&client, config).await?;

        info!("Successfully connected to Redis");
        Ok(Self { manager })
    }

    /// Connect to Redis with exponential backoff retry on failure
    async fn connect_with_retry(
        client: &redis::Client,
        config: &RedisConnectionConfig,
    ) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(Duration::from_secs(config.connection_timeout_secs))
            .set_response_timeout(Duration::from_secs(config.response_timeout_secs))
            .set_number_of_retries(config.reconnection_retries)
            .set_exponent_base(config.retry_exponent_base)
            .set_max_delay(config.max_retry_delay_ms);

        let max_retries = config.initial_connection_retries;
        let mut delay_ms = config.initial_retry_delay_ms;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await
            {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {} retries", attempt);
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < max_retries {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            max_retries + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::storage(format!(
            "Failed to connect to Redis after {} attempts: {}",
            max_retries + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }

    /// Map a Redis failure to a storage error, logging the operation
    fn redis_error(operation: &'static str) -> impl FnOnce(RedisError) -> AppError {
        move |e| {
            error!("Redis {} operation failed: {}", operation, e);
            AppError::storage(format!("Token store {operation} failed")).with_source(e)
        }
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
        serde_json::from_slice(bytes).map_err(|e| {
            AppError::storage(format!("Corrupt token store record: {e}")).with_source(e)
        })
    }

    /// Millisecond TTL for `PSETEX`
    fn ttl_millis(ttl: Duration) -> u64 {
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    async fn delete_pair(&self, record: &StoredToken) -> AppResult<(u64, u64)> {
        let mut conn = self.manager.clone();
        redis::pipe()
            .atomic()
            .del(token_key(&record.access_token))
            .del(token_key(&record.refresh_token))
            .query_async(&mut conn)
            .await
            .map_err(Self::redis_error("DEL"))
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store_token(&self, record: &StoredToken) -> AppResult<()> {
        let ttl = Self::ttl_millis(ttl_until(record.expires_at, "token")?);
        let data = serde_json::to_vec(record)?;
        let mut conn = self.manager.clone();

        // Both keys become visible together or not at all
        let (): () = redis::pipe()
            .atomic()
            .pset_ex(token_key(&record.access_token), &data, ttl)
            .ignore()
            .pset_ex(token_key(&record.refresh_token), &data, ttl)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(Self::redis_error("SET"))?;

        Ok(())
    }

    async fn get_token(&self, token: &str) -> AppResult<Option<StoredToken>> {
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = conn
            .get(token_key(token))
            .await
            .map_err(Self::redis_error("GET"))?;

        let Some(bytes) = data else {
            return Ok(None);
        };
        let record: StoredToken = Self::decode(&bytes)?;

        if record.is_expired() {
            self.delete_pair(&record).await?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    async fn revoke_token(&self, token: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = conn
            .get(token_key(token))
            .await
            .map_err(Self::redis_error("GET"))?;

        let Some(bytes) = data else {
            return Ok(false);
        };
        let record: StoredToken = Self::decode(&bytes)?;

        let (access_deleted, refresh_deleted) = self.delete_pair(&record).await?;
        let presented_deleted = if token == record.access_token {
            access_deleted
        } else {
            refresh_deleted
        };

        Ok(presented_deleted > 0 && !record.is_expired())
    }

    async fn store_code(&self, code: &AuthorizationCode) -> AppResult<()> {
        let ttl = Self::ttl_millis(ttl_until(code.expires_at, "code")?);
        let data = serde_json::to_vec(code)?;
        let mut conn = self.manager.clone();

        let (): () = conn
            .pset_ex(code_key(&code.code), data, ttl)
            .await
            .map_err(Self::redis_error("SET"))?;
        Ok(())
    }

    async fn get_code(&self, code: &str) -> AppResult<Option<AuthorizationCode>> {
        let key = code_key(code);
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = conn
            .get(&key)
            .await
            .map_err(Self::redis_error("GET"))?;

        let Some(bytes) = data else {
            return Ok(None);
        };
        let auth_code: AuthorizationCode = Self::decode(&bytes)?;

        if auth_code.is_expired() {
            let _: u64 = conn.del(&key).await.map_err(Self::redis_error("DEL"))?;
            return Ok(None);
        }

        Ok(Some(auth_code))
    }

    async fn take_code(&self, code: &str) -> AppResult<Option<AuthorizationCode>> {
        let mut conn = self.manager.clone();
        let data: Option<Vec<u8>> = redis::cmd("GETDEL")
            .arg(code_key(code))
            .query_async(&mut conn)
            .await
            .map_err(Self::redis_error("GETDEL"))?;

        let Some(bytes) = data else {
            return Ok(None);
        };
        let auth_code: AuthorizationCode = Self::decode(&bytes)?;

        Ok(Some(auth_code).filter(|c| !c.is_expired()))
    }

    async fn delete_code(&self, code: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let _: u64 = conn
            .del(code_key(code))
            .await
            .map_err(Self::redis_error("DEL"))?;
        Ok(())
    }

    async fn store_state(&self, state: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        let ttl = Self::ttl_millis(ttl_until(expires_at, "state")?);
        let mut conn = self.manager.clone();

        let (): () = conn
            .pset_ex(state_key(state), STATE_MARKER, ttl)
            .await
            .map_err(Self::redis_error("SET"))?;
        Ok(())
    }

    async fn consume_state(&self, state: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        let deleted: u64 = conn
            .del(state_key(state))
            .await
            .map_err(Self::redis_error("DEL"))?;
        Ok(deleted > 0)
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();

        // Use PING to verify Redis connection is healthy
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::redis_error("PING"))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Unexpected PING response '{response}'"
            )))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
