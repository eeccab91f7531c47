//! Studio error types.

use thiserror::Error;

pub type StudioResult<T> = Result<T, StudioError>;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Nothing to process: {0}")]
    NothingToProcess(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Account store error: {0}")]
    AccountStore(String),

    #[error("Media error: {0}")]
    Media(#[from] reelcut_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    pub fn nothing_to_process(msg: impl Into<String>) -> Self {
        Self::NothingToProcess(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    pub fn acquisition_failed(msg: impl Into<String>) -> Self {
        Self::AcquisitionFailed(msg.into())
    }

    pub fn invalid_registration(msg: impl Into<String>) -> Self {
        Self::InvalidRegistration(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn account_store(msg: impl Into<String>) -> Self {
        Self::AccountStore(msg.into())
    }

    /// Check if the request was refused before any work started.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, StudioError::AccessDenied(_))
    }

    /// Check if there was no usable segment to render.
    pub fn is_nothing_to_process(&self) -> bool {
        matches!(self, StudioError::NothingToProcess(_))
    }

    /// Short text suitable for showing to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            StudioError::AccessDenied(_) => "Access denied: no credits left. Upgrade to premium for unlimited clips.",
            StudioError::NothingToProcess(_) | StudioError::AnalysisFailed(_) => {
                "Nothing to process: no usable clip segments were found."
            }
            StudioError::AcquisitionFailed(_) => "Could not fetch the source video.",
            StudioError::InvalidRegistration(_) => "Registration rejected.",
            StudioError::ConfigError(_) | StudioError::AccountStore(_) => "Service unavailable, please try again later.",
            StudioError::ProcessingFailed(_) | StudioError::Media(_) | StudioError::Io(_) => {
                "Processing failed: the clip could not be rendered."
            }
        }
    }
}
