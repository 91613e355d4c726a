// ABOUTME: In-memory token store with LRU eviction and TTL support
// ABOUTME: Includes background cleanup task for expired entries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{code_key, state_key, token_key, ttl_until, TokenStore};
use crate::config::StoreConfig;
use crate::errors::AppResult;
use crate::oauth2_server::models::{AuthorizationCode, StoredToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

type Entries = LruCache<String, StoreEntry>;

#[derive(Debug, Clone)]
enum StoreValue {
    Token(Arc<StoredToken>),
    Code(AuthorizationCode),
    State,
}

#[derive(Debug, Clone)]
struct StoreEntry {
    value: StoreValue,
    expires_at: DateTime<Utc>,
}

impl StoreEntry {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// In-memory token store with LRU eviction and background cleanup
///
/// Uses `Arc<RwLock<LruCache>>` for shared state between store operations and the cleanup
/// task. Every operation takes the write lock once, which is what makes the dual-key token
/// write, `take_code` and `consume_state` atomic.
#[derive(Clone)]
pub struct InMemoryTokenStore {
    entries: Arc<RwLock<Entries>>,
    shutdown_tx: Option<Arc<tokio::sync::mpsc::Sender<()>>>,
}

impl InMemoryTokenStore {
    /// Capacity used when config specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a store, spawning the cleanup task when enabled
    ///
    /// Must be called inside a tokio runtime when background cleanup is enabled.
    #[must_use]
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let entries = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
            let entries_clone = entries.clone();
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&entries_clone).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("Token store cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self {
            entries,
            shutdown_tx,
        }
    }

    /// Remove every expired entry now, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        Self::cleanup_expired(&self.entries).await
    }

    /// Number of live keys, counting each token record twice
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn cleanup_expired(entries: &Arc<RwLock<Entries>>) -> usize {
        let mut guard = entries.write().await;

        // Collect expired keys first (can't modify while iterating)
        let expired_keys: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            guard.pop(key);
        }

        let removed = expired_keys.len();
        drop(guard);
        if removed > 0 {
            tracing::debug!("Cleaned up {} expired token store entries", removed);
        }
        removed
    }

    /// Insert an entry; when LRU eviction drops one half of a token pair, drop the other too
    fn insert(entries: &mut Entries, key: String, entry: StoreEntry) {
        if let Some((evicted_key, evicted)) = entries.push(key.clone(), entry) {
            if evicted_key != key {
                if let StoreValue::Token(record) = evicted.value {
                    Self::remove_pair(entries, &record);
                }
            }
        }
    }

    fn remove_pair(entries: &mut Entries, record: &StoredToken) {
        entries.pop(&token_key(&record.access_token));
        entries.pop(&token_key(&record.refresh_token));
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store_token(&self, record: &StoredToken) -> AppResult<()> {
        ttl_until(record.expires_at, "token")?;

        let shared = Arc::new(record.clone());
        let entry = StoreEntry {
            value: StoreValue::Token(shared),
            expires_at: record.expires_at,
        };

        let mut entries = self.entries.write().await;
        Self::insert(&mut entries, token_key(&record.access_token), entry.clone());
        Self::insert(&mut entries, token_key(&record.refresh_token), entry);
        Ok(())
    }

    async fn get_token(&self, token: &str) -> AppResult<Option<StoredToken>> {
        let mut entries = self.entries.write().await;

        // LruCache::get is mutable (updates access order for LRU)
        let Some(entry) = entries.get(&token_key(token)) else {
            return Ok(None);
        };
        let StoreValue::Token(record) = &entry.value else {
            return Ok(None);
        };
        let record = Arc::clone(record);

        if entry.is_expired() {
            Self::remove_pair(&mut entries, &record);
            return Ok(None);
        }

        Ok(Some(StoredToken::clone(&record)))
    }

    async fn revoke_token(&self, token: &str) -> AppResult<bool> {
        let mut entries = self.entries.write().await;

        let Some(entry) = entries.peek(&token_key(token)) else {
            return Ok(false);
        };
        let StoreValue::Token(record) = &entry.value else {
            return Ok(false);
        };
        let record = Arc::clone(record);
        let was_live = !entry.is_expired();

        Self::remove_pair(&mut entries, &record);
        Ok(was_live)
    }

    async fn store_code(&self, code: &AuthorizationCode) -> AppResult<()> {
        ttl_until(code.expires_at, "code")?;

        let entry = StoreEntry {
            value: StoreValue::Code(code.clone()),
            expires_at: code.expires_at,
        };
        Self::insert(&mut *self.entries.write().await, code_key(&code.code), entry);
        Ok(())
    }

    async fn get_code(&self, code: &str) -> AppResult<Option<AuthorizationCode>> {
        let key = code_key(code);
        let mut entries = self.entries.write().await;

        let lookup = entries
            .get(&key)
            .map(|entry| (entry.is_expired(), entry.value.clone()));

        match lookup {
            Some((true, _)) => {
                entries.pop(&key);
                Ok(None)
            }
            Some((false, StoreValue::Code(auth_code))) => Ok(Some(auth_code)),
            _ => Ok(None),
        }
    }

    async fn take_code(&self, code: &str) -> AppResult<Option<AuthorizationCode>> {
        let entry = self.entries.write().await.pop(&code_key(code));

        Ok(entry.and_then(|entry| match entry.value {
            StoreValue::Code(auth_code) if !entry.is_expired() => Some(auth_code),
            _ => None,
        }))
    }

    async fn delete_code(&self, code: &str) -> AppResult<()> {
        self.entries.write().await.pop(&code_key(code));
        Ok(())
    }

    async fn store_state(&self, state: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        ttl_until(expires_at, "state")?;

        let entry = StoreEntry {
            value: StoreValue::State,
            expires_at,
        };
        Self::insert(&mut *self.entries.write().await, state_key(state), entry);
        Ok(())
    }

    async fn consume_state(&self, state: &str) -> AppResult<bool> {
        let entry = self.entries.write().await.pop(&state_key(state));
        Ok(entry
            .is_some_and(|entry| matches!(entry.value, StoreValue::State) && !entry.is_expired()))
    }

    async fn health_check(&self) -> AppResult<()> {
        // In-memory store is always healthy
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

impl Drop for InMemoryTokenStore {
    fn drop(&mut self) {
        // Only the last clone holds the sole reference to the sender
        if let Some(tx) = &self.shutdown_tx {
            if Arc::strong_count(tx) == 1 {
                if let Err(e) = tx.try_send(()) {
                    tracing::debug!(error = ?e, "Token store shutdown signal send failed (channel likely closed)");
                }
            }
        }
    }
}
