// ABOUTME: Credential store abstraction for user accounts
// ABOUTME: Defines the UserRepository trait, the tagged UserLookup result and backend selection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Credential Store
//!
//! Lookups return [`UserLookup`] instead of `Result<Option<User>>` so that every call site
//! has to decide separately what "no such user" and "the store failed" mean for it. The
//! federated login upsert, for instance, creates an account only on
//! [`UserLookup::NotFound`] and aborts on [`UserLookup::Error`].

/// `DashMap` backed repository for tests and single-process deployments
pub mod memory;
/// SQLite backed repository
pub mod sqlite;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{NewUser, User};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub use memory::InMemoryUserRepository;
pub use sqlite::SqliteUserRepository;

/// Outcome of a user lookup
#[derive(Debug)]
pub enum UserLookup {
    /// The account exists
    Found(User),
    /// No account matched
    NotFound,
    /// The store could not answer
    Error(AppError),
}

/// Persistence for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find an account by its login email
    async fn find_by_email(&self, email: &str) -> UserLookup;

    /// Find an account by id
    async fn find_by_id(&self, id: Uuid) -> UserLookup;

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` when the email is taken, or a database error.
    async fn create(&self, new_user: NewUser) -> AppResult<User>;
}

/// Build the repository selected by `DATABASE_URL`
///
/// # Errors
///
/// Returns an error if the SQLite database cannot be opened or migrated.
pub async fn create_user_repository(
    config: &DatabaseConfig,
) -> AppResult<Arc<dyn UserRepository>> {
    if config.is_memory() {
        info!("Using in-memory user repository");
        return Ok(Arc::new(InMemoryUserRepository::new()));
    }

    info!("Using SQLite user repository");
    Ok(Arc::new(SqliteUserRepository::connect(&config.url).await?))
}
