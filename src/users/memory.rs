// ABOUTME: In-process user repository backed by sharded concurrent maps
// ABOUTME: Used by tests and by DATABASE_URL=memory deployments
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{UserLookup, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{NewUser, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// User repository held entirely in memory
///
/// Accounts are keyed by id with a separate email index. The email index entry is held
/// while the account is inserted, so two concurrent registrations for one email cannot
/// both succeed.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<DashMap<Uuid, User>>,
    email_index: Arc<DashMap<String, Uuid>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a stored account, used by tests to deactivate users
    pub fn update(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Number of stored accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no account has been created
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> UserLookup {
        let Some(id) = self.email_index.get(email).map(|entry| *entry.value()) else {
            return UserLookup::NotFound;
        };
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> UserLookup {
        self.users
            .get(&id)
            .map_or(UserLookup::NotFound, |entry| {
                UserLookup::Found(entry.value().clone())
            })
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        match self.email_index.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::already_exists(format!(
                "User with email {} already exists",
                new_user.email
            ))),
            Entry::Vacant(slot) => {
                let user = User::from_new(new_user);
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::models::UserRole;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            password_hash: None,
            first_name: "Grace".to_owned(),
            last_name: "Hopper".to_owned(),
            phone: Some("+15550100".to_owned()),
            role: UserRole::Parent,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryUserRepository::new();
        let created = repo.create(new_user("grace@example.com")).await.unwrap();

        let UserLookup::Found(by_email) = repo.find_by_email("grace@example.com").await else {
            panic!("expected user by email");
        };
        assert_eq!(by_email.id, created.id);

        let UserLookup::Found(by_id) = repo.find_by_id(created.id).await else {
            panic!("expected user by id");
        };
        assert_eq!(by_id.email, "grace@example.com");
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        assert!(matches!(
            repo.find_by_email("nobody@example.com").await,
            UserLookup::NotFound
        ));
        assert!(matches!(
            repo.find_by_id(Uuid::new_v4()).await,
            UserLookup::NotFound
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("dup@example.com")).await.unwrap();

        let error = repo.create(new_user("dup@example.com")).await.unwrap_err();
        assert_eq!(error.code, ErrorCode::ResourceAlreadyExists);
        assert_eq!(repo.len(), 1);
    }
}
