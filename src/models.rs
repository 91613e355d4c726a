// ABOUTME: Core data models for the authorization server
// ABOUTME: Defines User, UserRole and NewUser shared by the credential store and auth services
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! The account record owned by the credential store. Token and code records live next to
//! the OAuth server in [`crate::oauth2_server::models`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Household role carried in access token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full control over the household
    Admin,
    /// Parent or guardian
    Parent,
    /// Regular household member
    #[default]
    Member,
    /// Child account
    Child,
}

impl UserRole {
    /// Wire and database representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Parent => "parent",
            Self::Member => "member",
            Self::Child => "child",
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "parent" => Ok(Self::Parent),
            "member" => Ok(Self::Member),
            "child" => Ok(Self::Child),
            other => Err(format!("unknown user role '{other}'")),
        }
    }
}

/// A user account
///
/// `password_hash` is `None` for accounts created through federated login; such accounts
/// can never pass password login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// Login email, unique across accounts
    pub email: String,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Household role
    pub role: UserRole,
    /// Inactive accounts cannot log in or refresh
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Last modification
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh active account from registration data
    #[must_use]
    pub fn from_new(new_user: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            phone: new_user.phone,
            role: new_user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account can authenticate with a password
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Data needed to create a user account
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email
    pub email: String,
    /// bcrypt hash, `None` for federated accounts
    pub password_hash: Option<String>,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Household role
    pub role: UserRole,
}
