//! Studio configuration.

use std::path::PathBuf;
use std::time::Duration;

use reelcut_models::EncodingConfig;

/// Runtime configuration, read once at startup.
#[derive(Clone)]
pub struct StudioConfig {
    /// Gemini API key; required only for candidate analysis
    pub gemini_api_key: Option<String>,
    /// Gemini model used for candidate analysis
    pub gemini_model: String,
    /// Supabase project URL for the account store
    pub supabase_url: Option<String>,
    /// Supabase service key for the account store
    pub supabase_key: Option<String>,
    /// Email that receives the administrative override
    pub admin_email: Option<String>,
    /// Local account file used when no Supabase store is configured;
    /// defaults to `accounts.json` in the work directory
    pub accounts_file: Option<PathBuf>,
    /// Work directory for temporary files
    pub work_dir: PathBuf,
    /// Upper bound on waiting for an uploaded video to become analyzable
    pub analysis_timeout: Duration,
    /// Poll interval while waiting for analysis readiness
    pub analysis_poll_interval: Duration,
    /// Per-clip encode timeout; `None` waits indefinitely
    pub encode_timeout_secs: Option<u64>,
    /// Explicit frontal face cascade file
    pub face_cascade: Option<PathBuf>,
    /// Bound on the credit decrement call
    pub credit_timeout: Duration,
    pub encoding: EncodingConfig,
}

impl std::fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioConfig")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &self.supabase_key.as_ref().map(|_| "<redacted>"))
            .field("admin_email", &self.admin_email)
            .field("accounts_file", &self.accounts_file)
            .field("work_dir", &self.work_dir)
            .field("analysis_timeout", &self.analysis_timeout)
            .field("analysis_poll_interval", &self.analysis_poll_interval)
            .field("encode_timeout_secs", &self.encode_timeout_secs)
            .field("face_cascade", &self.face_cascade)
            .field("credit_timeout", &self.credit_timeout)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            supabase_url: None,
            supabase_key: None,
            admin_email: None,
            accounts_file: None,
            work_dir: PathBuf::from("/tmp/reelcut"),
            analysis_timeout: Duration::from_secs(60),
            analysis_poll_interval: Duration::from_secs(2),
            encode_timeout_secs: None,
            face_cascade: None,
            credit_timeout: Duration::from_secs(5),
            encoding: EncodingConfig::default(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn encoding_from_env(mut encoding: EncodingConfig) -> EncodingConfig {
    if let Some(crf) = non_empty_var("REELCUT_CRF").and_then(|s| s.parse().ok()) {
        encoding = encoding.with_crf(crf);
    }
    if let Some(preset) = non_empty_var("REELCUT_PRESET") {
        encoding = encoding.with_preset(preset);
    }
    encoding
}

impl StudioConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_key: non_empty_var("SUPABASE_KEY"),
            admin_email: non_empty_var("ADMIN_EMAIL"),
            accounts_file: non_empty_var("REELCUT_ACCOUNTS_FILE").map(PathBuf::from),
            work_dir: non_empty_var("REELCUT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            analysis_timeout: Duration::from_secs(
                std::env::var("REELCUT_ANALYSIS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            analysis_poll_interval: Duration::from_secs(
                std::env::var("REELCUT_ANALYSIS_POLL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|s| *s > 0)
                    .unwrap_or(2),
            ),
            encode_timeout_secs: std::env::var("REELCUT_ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0),
            face_cascade: non_empty_var("REELCUT_FACE_CASCADE").map(PathBuf::from),
            credit_timeout: defaults.credit_timeout,
            encoding: encoding_from_env(defaults.encoding),
        }
    }

    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Where the local account store keeps its records.
    pub fn accounts_path(&self) -> PathBuf {
        self.accounts_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join("accounts.json"))
    }

    /// Whether `email` is the configured admin. Comparison ignores case.
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .map(|admin| admin.eq_ignore_ascii_case(email.trim()))
            .unwrap_or(false)
    }
}
