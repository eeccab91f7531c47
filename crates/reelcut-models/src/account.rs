//! Account model.
//!
//! The account record is owned by an external store; the engine only reads
//! the balance and premium flag and requests a single decrement per request.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Credits granted to a freshly registered account.
pub const DEFAULT_FREE_CREDITS: i64 = 2;

/// Nominal balance shown for premium and admin accounts.
pub const PREMIUM_CREDITS: i64 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Account {
    pub email: String,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub is_premium: bool,
}

impl Account {
    /// New free-tier account.
    pub fn new_free(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            credits: DEFAULT_FREE_CREDITS,
            is_premium: false,
        }
    }

    /// Unlimited account.
    pub fn new_premium(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            credits: PREMIUM_CREDITS,
            is_premium: true,
        }
    }

    /// Whether this account may start a render.
    pub fn has_access(&self) -> bool {
        self.is_premium || self.credits > 0
    }
}
