//! Per-request identity.

use serde::{Deserialize, Serialize};

use crate::config::StudioConfig;

/// Role of the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// Identity of the caller for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub email: String,
    pub role: Role,
}

impl RequestContext {
    /// Build a context for `email`, granting the admin role when it matches
    /// the configured admin.
    pub fn for_email(email: impl Into<String>, config: &StudioConfig) -> Self {
        let email = email.into().trim().to_string();
        let role = if config.is_admin(&email) {
            Role::Admin
        } else {
            Role::User
        };
        Self { email, role }
    }

    pub fn user(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::User,
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
