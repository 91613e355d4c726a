// ABOUTME: SQLite user repository using sqlx
// ABOUTME: Creates the users table on connect and maps rows to the User model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{UserLookup, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{NewUser, User, UserRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use tracing::{debug, error};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
                            is_active, created_at, updated_at";

/// User repository backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: Pool<Sqlite>,
}

impl SqliteUserRepository {
    /// Open (creating if needed) the database at `database_url` and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the schema migration fails.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure SQLite creates the database file if it doesn't exist
        let connection_url = if in_memory || database_url.contains('?') {
            database_url.to_owned()
        } else {
            if let Some(parent) = database_url
                .strip_prefix("sqlite:")
                .map(Path::new)
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
            {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::database(format!(
                        "Failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            format!("{database_url}?mode=rwc")
        };

        // Every connection to `:memory:` is a separate database, so keep exactly one
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_url)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Create the users table and indexes
    async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                phone TEXT,
                role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('admin', 'parent', 'member', 'child')),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)")
            .execute(&self.pool)
            .await?;

        debug!("users table ready");
        Ok(())
    }

    async fn fetch_one_by(&self, field: &str, value: String) -> UserLookup {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE {field} = $1");

        let row = match sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                error!(field, error = %e, "User lookup failed");
                return UserLookup::Error(e.into());
            }
        };

        match row.as_ref().map(Self::row_to_user).transpose() {
            Ok(Some(user)) => UserLookup::Found(user),
            Ok(None) => UserLookup::NotFound,
            Err(e) => UserLookup::Error(e),
        }
    }

    /// Convert a database row to a User struct
    fn row_to_user(row: &SqliteRow) -> AppResult<User> {
        let id: String = row.try_get("id")?;
        let role: String = row.try_get("role")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(User {
            id: Uuid::parse_str(&id)
                .map_err(|e| AppError::database(format!("Invalid user id '{id}': {e}")))?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            role: role.parse::<UserRole>().map_err(AppError::database)?,
            is_active: row.try_get("is_active")?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_email(&self, email: &str) -> UserLookup {
        self.fetch_one_by("email", email.to_owned()).await
    }

    async fn find_by_id(&self, id: Uuid) -> UserLookup {
        self.fetch_one_by("id", id.to_string()).await
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let user = User::from_new(new_user);

        let result = sqlx::query(
            r"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role,
                               is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::already_exists(format!("User with email {} already exists", user.email)),
            ),
            Err(e) => Err(e.into()),
        }
    }
}
