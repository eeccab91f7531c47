//! Structured render logging.
//!
//! Every render request gets a `request_id`; log lines for that request carry
//! it together with the operation name so interleaved requests stay readable.

use tracing::{error, info, warn, Span};

/// Request logger with consistent structured fields.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    request_id: String,
    operation: String,
}

impl RenderLogger {
    pub fn new(request_id: &str, operation: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Render started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Render progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Render warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Render error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Render completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span covering the whole request.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}
