//! Account storage.
//!
//! Accounts live in a key-value store keyed by email: Supabase in production,
//! a local JSON file otherwise. The studio
//! reads the balance and premium flag, requests one decrement per successful
//! render, and exposes a small administration surface (registration, premium
//! grants). Passwords are passed through to the store and never inspected.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use reelcut_models::account::{DEFAULT_FREE_CREDITS, PREMIUM_CREDITS};
use reelcut_models::Account;

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 4;

/// Domain fragments of throwaway mailbox providers.
const DISPOSABLE_EMAIL_MARKERS: &[&str] = &["tempmail", "10minutemail", "guerrillamail", "yopmail", "mailinator"];

/// Account store operations.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look up an account by email.
    async fn find(&self, email: &str) -> StudioResult<Option<Account>>;

    /// Remove one credit, returning the new balance.
    async fn decrement_credits(&self, email: &str) -> StudioResult<i64>;

    /// Create a free-tier account.
    async fn register(&self, email: &str, password: &str) -> StudioResult<Account>;

    /// Grant (premium, unlimited balance) or revoke (back to the free balance)
    /// premium status.
    async fn set_premium(&self, email: &str, premium: bool) -> StudioResult<()>;

    /// Emails of all premium accounts.
    async fn list_premium(&self) -> StudioResult<Vec<String>>;
}

/// Whether the address belongs to a disposable mailbox provider.
pub fn is_disposable_email(email: &str) -> bool {
    let domain = email
        .rsplit_once('@')
        .map(|(_, d)| d)
        .unwrap_or(email)
        .to_ascii_lowercase();
    DISPOSABLE_EMAIL_MARKERS.iter().any(|m| domain.contains(m))
}

/// Check registration input before it reaches the store.
pub fn validate_registration(email: &str, password: &str) -> StudioResult<()> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(StudioError::invalid_registration(format!("not an email address: {}", email))),
    }
    if is_disposable_email(email) {
        return Err(StudioError::invalid_registration("disposable email addresses are not accepted"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StudioError::invalid_registration(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Resolve the account for a request: the admin gets a synthesized premium
/// account without a store lookup.
pub async fn resolve_account(store: &dyn AccountStore, email: &str, is_admin: bool) -> StudioResult<Option<Account>> {
    if is_admin {
        return Ok(Some(Account::new_premium(email)));
    }
    store.find(email).await
}

/// Premium members for the admin listing, without the admin itself.
pub async fn premium_members(store: &dyn AccountStore, config: &StudioConfig) -> StudioResult<Vec<String>> {
    let mut emails = store.list_premium().await?;
    emails.retain(|e| !config.is_admin(e));
    emails.sort();
    Ok(emails)
}

// =============================================================================
// Shared record operations
// =============================================================================

type AccountMap = HashMap<String, Account>;

fn account_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn account_mut<'a>(accounts: &'a mut AccountMap, email: &str) -> StudioResult<&'a mut Account> {
    accounts
        .get_mut(&account_key(email))
        .ok_or_else(|| StudioError::account_store(format!("no account for {}", email)))
}

fn decrement_in(accounts: &mut AccountMap, email: &str) -> StudioResult<i64> {
    let account = account_mut(accounts, email)?;
    account.credits = (account.credits - 1).max(0);
    Ok(account.credits)
}

fn register_in(accounts: &mut AccountMap, email: &str) -> StudioResult<Account> {
    let key = account_key(email);
    if accounts.contains_key(&key) {
        return Err(StudioError::invalid_registration("email already registered"));
    }
    let account = Account::new_free(email.trim());
    accounts.insert(key, account.clone());
    Ok(account)
}

fn set_premium_in(accounts: &mut AccountMap, email: &str, premium: bool) -> StudioResult<()> {
    let account = account_mut(accounts, email)?;
    account.is_premium = premium;
    account.credits = if premium { PREMIUM_CREDITS } else { DEFAULT_FREE_CREDITS };
    Ok(())
}

fn premium_in(accounts: &AccountMap) -> Vec<String> {
    accounts
        .values()
        .filter(|a| a.is_premium)
        .map(|a| a.email.clone())
        .collect()
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store for tests and embedding. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<AccountMap>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given accounts.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let map = accounts.into_iter().map(|a| (account_key(&a.email), a)).collect();
        Self {
            accounts: RwLock::new(map),
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find(&self, email: &str) -> StudioResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&account_key(email)).cloned())
    }

    async fn decrement_credits(&self, email: &str) -> StudioResult<i64> {
        decrement_in(&mut *self.accounts.write().await, email)
    }

    async fn register(&self, email: &str, _password: &str) -> StudioResult<Account> {
        register_in(&mut *self.accounts.write().await, email)
    }

    async fn set_premium(&self, email: &str, premium: bool) -> StudioResult<()> {
        set_premium_in(&mut *self.accounts.write().await, email, premium)
    }

    async fn list_premium(&self) -> StudioResult<Vec<String>> {
        Ok(premium_in(&*self.accounts.read().await))
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Store keeping every account in one JSON file, for single-machine use
/// without Supabase. Each mutation reads the file, applies the change and
/// replaces the file through a rename, so a crash never leaves it half written.
///
/// The lock serializes access within one process only.
#[derive(Debug)]
pub struct JsonFileAccountStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StudioResult<AccountMap> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AccountMap::new()),
            Err(e) => return Err(e.into()),
        };
        let accounts: Vec<Account> = serde_json::from_slice(&raw).map_err(|e| {
            StudioError::account_store(format!("Corrupt account file {}: {}", self.path.display(), e))
        })?;
        Ok(accounts.into_iter().map(|a| (account_key(&a.email), a)).collect())
    }

    async fn save(&self, accounts: &AccountMap) -> StudioResult<()> {
        let mut rows: Vec<&Account> = accounts.values().collect();
        rows.sort_by(|a, b| a.email.cmp(&b.email));
        let json = serde_json::to_vec_pretty(&rows)
            .map_err(|e| StudioError::account_store(format!("Failed to encode accounts: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    /// Load, apply `change`, and write back if it succeeded.
    async fn modify<T>(&self, change: impl FnOnce(&mut AccountMap) -> StudioResult<T>) -> StudioResult<T> {
        let _guard = self.lock.lock().await;
        let mut accounts = self.load().await?;
        let result = change(&mut accounts)?;
        self.save(&accounts).await?;
        Ok(result)
    }
}

#[async_trait]
impl AccountStore for JsonFileAccountStore {
    async fn find(&self, email: &str) -> StudioResult<Option<Account>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(&account_key(email)))
    }

    async fn decrement_credits(&self, email: &str) -> StudioResult<i64> {
        let credits = self.modify(|accounts| decrement_in(accounts, email)).await?;
        debug!(email = %email, credits, "Decremented credits");
        Ok(credits)
    }

    async fn register(&self, email: &str, _password: &str) -> StudioResult<Account> {
        let account = self.modify(|accounts| register_in(accounts, email)).await?;
        info!(email = %account.email, path = %self.path.display(), "Registered account");
        Ok(account)
    }

    async fn set_premium(&self, email: &str, premium: bool) -> StudioResult<()> {
        self.modify(|accounts| set_premium_in(accounts, email, premium)).await?;
        info!(email = %email, premium, "Updated premium status");
        Ok(())
    }

    async fn list_premium(&self) -> StudioResult<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(premium_in(&self.load().await?))
    }
}

// =============================================================================
// Supabase (PostgREST) store
// =============================================================================

const USERS_TABLE: &str = "users";

#[derive(Debug, Serialize)]
struct NewUserRow<'a> {
    email: &'a str,
    password: &'a str,
    credits: i64,
    is_premium: bool,
}

#[derive(Debug, Deserialize)]
struct EmailRow {
    email: String,
}

/// Store backed by a Supabase `users` table over its REST interface.
pub struct SupabaseAccountStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseAccountStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Create a store from configuration, if credentials are present.
    pub fn from_config(config: &StudioConfig) -> Option<Self> {
        match (&config.supabase_url, &config.supabase_key) {
            (Some(url), Some(key)) => Some(Self::new(url.clone(), key.clone())),
            _ => None,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, USERS_TABLE)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, builder: RequestBuilder, action: &str) -> StudioResult<reqwest::Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| StudioError::account_store(format!("{} request failed: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            if status == StatusCode::CONFLICT {
                return Err(StudioError::invalid_registration("email already registered"));
            }
            return Err(StudioError::account_store(format!(
                "{} returned {}: {}",
                action, status, error_text
            )));
        }
        Ok(response)
    }

    async fn update(&self, email: &str, patch: serde_json::Value, action: &str) -> StudioResult<Vec<Account>> {
        let builder = self
            .client
            .patch(self.table_url())
            .query(&[("email", format!("eq.{}", email))])
            .header("Prefer", "return=representation")
            .json(&patch);
        self.send(builder, action)
            .await?
            .json()
            .await
            .map_err(|e| StudioError::account_store(format!("Failed to parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl AccountStore for SupabaseAccountStore {
    async fn find(&self, email: &str) -> StudioResult<Option<Account>> {
        let builder = self.client.get(self.table_url()).query(&[
            ("select", "email,credits,is_premium".to_string()),
            ("email", format!("eq.{}", email)),
        ]);
        let rows: Vec<Account> = self
            .send(builder, "account lookup")
            .await?
            .json()
            .await
            .map_err(|e| StudioError::account_store(format!("Failed to parse account row: {}", e)))?;
        Ok(rows.into_iter().next())
    }

    async fn decrement_credits(&self, email: &str) -> StudioResult<i64> {
        let account = self
            .find(email)
            .await?
            .ok_or_else(|| StudioError::account_store(format!("no account for {}", email)))?;
        let credits = (account.credits - 1).max(0);
        self.update(email, serde_json::json!({ "credits": credits }), "credit decrement")
            .await?;
        debug!(email = %email, credits, "Decremented credits");
        Ok(credits)
    }

    async fn register(&self, email: &str, password: &str) -> StudioResult<Account> {
        let email = email.trim();
        if self.find(email).await?.is_some() {
            return Err(StudioError::invalid_registration("email already registered"));
        }
        let row = NewUserRow {
            email,
            password,
            credits: DEFAULT_FREE_CREDITS,
            is_premium: false,
        };
        self.send(self.client.post(self.table_url()).json(&row), "registration")
            .await?;
        info!(email = %email, "Registered account");
        Ok(Account::new_free(email))
    }

    async fn set_premium(&self, email: &str, premium: bool) -> StudioResult<()> {
        let credits = if premium { PREMIUM_CREDITS } else { DEFAULT_FREE_CREDITS };
        let updated = self
            .update(
                email,
                serde_json::json!({ "is_premium": premium, "credits": credits }),
                "premium update",
            )
            .await?;
        if updated.is_empty() {
            return Err(StudioError::account_store(format!("no account for {}", email)));
        }
        info!(email = %email, premium, "Updated premium status");
        Ok(())
    }

    async fn list_premium(&self) -> StudioResult<Vec<String>> {
        let builder = self.client.get(self.table_url()).query(&[
            ("select", "email"),
            ("is_premium", "eq.true"),
        ]);
        let rows: Vec<EmailRow> = self
            .send(builder, "premium listing")
            .await?
            .json()
            .await
            .map_err(|e| StudioError::account_store(format!("Failed to parse premium listing: {}", e)))?;
        Ok(rows.into_iter().map(|r| r.email).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposable_emails() {
        assert!(is_disposable_email("x@tempmail.dev"));
        assert!(is_disposable_email("x@MAILINATOR.com"));
        assert!(is_disposable_email("x@guerrillamail.org"));
        assert!(!is_disposable_email("x@gmail.com"));
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration("user@example.com", "abcd").is_ok());
        assert!(validate_registration("user@example.com", "abc").is_err());
        assert!(validate_registration("user@yopmail.com", "abcdef").is_err());
        assert!(validate_registration("not-an-email", "abcdef").is_err());
    }

    #[tokio::test]
    async fn test_register_and_decrement() {
        let store = InMemoryAccountStore::new();
        let account = store.register("new@example.com", "pass").await.unwrap();
        assert_eq!(account.credits, DEFAULT_FREE_CREDITS);
        assert!(!account.is_premium);

        assert_eq!(store.decrement_credits("NEW@example.com").await.unwrap(), 1);
        assert_eq!(store.decrement_credits("new@example.com").await.unwrap(), 0);
        assert_eq!(store.decrement_credits("new@example.com").await.unwrap(), 0);
        assert!(!store.find("new@example.com").await.unwrap().unwrap().has_access());
    }

    #[test]
    fn test_duplicate_registration() {
        let store = InMemoryAccountStore::new();
        tokio_test::assert_ok!(tokio_test::block_on(store.register("dup@example.com", "pass")));
        let err = tokio_test::assert_err!(tokio_test::block_on(store.register("dup@example.com", "pass")));
        assert!(matches!(err, StudioError::InvalidRegistration(_)));
    }

    #[tokio::test]
    async fn test_grant_and_revoke_premium() {
        let store = InMemoryAccountStore::with_accounts([Account::new_free("p@example.com")]);

        store.set_premium("p@example.com", true).await.unwrap();
        let account = store.find("p@example.com").await.unwrap().unwrap();
        assert!(account.is_premium);
        assert_eq!(account.credits, PREMIUM_CREDITS);

        store.set_premium("p@example.com", false).await.unwrap();
        let account = store.find("p@example.com").await.unwrap().unwrap();
        assert!(!account.is_premium);
        assert_eq!(account.credits, DEFAULT_FREE_CREDITS);
    }

    #[tokio::test]
    async fn test_premium_listing_hides_admin() {
        let store = InMemoryAccountStore::with_accounts([
            Account::new_premium("admin@example.com"),
            Account::new_premium("b@example.com"),
            Account::new_premium("a@example.com"),
            Account::new_free("free@example.com"),
        ]);
        let config = StudioConfig::default().with_admin_email("admin@example.com");
        let members = premium_members(&store, &config).await.unwrap();
        assert_eq!(members, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_admin_resolves_without_lookup() {
        let store = InMemoryAccountStore::new();
        let account = resolve_account(&store, "admin@example.com", true).await.unwrap().unwrap();
        assert!(account.is_premium);
        assert_eq!(account.credits, PREMIUM_CREDITS);
        assert!(resolve_account(&store, "admin@example.com", false).await.unwrap().is_none());
    }

    #[test]
    fn test_supabase_from_config() {
        assert!(SupabaseAccountStore::from_config(&StudioConfig::default()).is_none());
        let config = StudioConfig {
            supabase_url: Some("https://proj.supabase.co/".to_string()),
            supabase_key: Some("key".to_string()),
            ..Default::default()
        };
        let store = SupabaseAccountStore::from_config(&config).unwrap();
        assert_eq!(store.table_url(), "https://proj.supabase.co/rest/v1/users");
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("accounts.json");

        let store = JsonFileAccountStore::new(&path);
        assert!(store.find("u@example.com").await.unwrap().is_none());
        store.register("U@example.com", "pass").await.unwrap();
        assert!(path.exists());

        // Every run of the CLI opens a fresh store on the same file.
        for expected in [1, 0, 0] {
            let store = JsonFileAccountStore::new(&path);
            assert_eq!(store.decrement_credits("u@example.com").await.unwrap(), expected);
        }

        let account = JsonFileAccountStore::new(&path).find("u@example.com").await.unwrap().unwrap();
        assert_eq!(account.email, "U@example.com");
        assert!(!account.has_access());
    }

    #[tokio::test]
    async fn test_file_store_admin_operations_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");

        JsonFileAccountStore::new(&path).register("p@example.com", "pass").await.unwrap();
        JsonFileAccountStore::new(&path).set_premium("p@example.com", true).await.unwrap();

        let store = JsonFileAccountStore::new(&path);
        assert_eq!(store.list_premium().await.unwrap(), vec!["p@example.com"]);
        assert_eq!(store.find("p@example.com").await.unwrap().unwrap().credits, PREMIUM_CREDITS);

        let err = store.register("p@example.com", "pass").await.unwrap_err();
        assert!(matches!(err, StudioError::InvalidRegistration(_)));
        assert!(store.set_premium("ghost@example.com", true).await.is_err());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileAccountStore::new(&path).find("u@example.com").await.unwrap_err();
        assert!(matches!(err, StudioError::AccountStore(_)));
    }
}
