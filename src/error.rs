//! Error types for the speech pipeline.
//!
//! Every failure a request can hit maps to one variant, one HTTP status, and
//! one stable machine-readable kind string, so clients can branch on failures
//! without parsing message text.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, TtsError>;

/// Errors surfaced by the request-to-audio pipeline.
#[derive(Debug, Error)]
pub enum TtsError {
    /// The requested voice name does not match the `<lang>_<REGION>-<name>-<quality>`
    /// grammar, or contains path separators or traversal sequences.
    #[error("Invalid voice name: '{0}'")]
    InvalidVoiceName(String),

    /// The request body parsed but is semantically unusable (e.g. empty input).
    #[error("{0}")]
    InvalidRequest(String),

    /// The voice store has no assets under this name.
    #[error("Voice '{0}' not found.")]
    VoiceNotFound(String),

    /// The voice store could not be reached, or a download could not be
    /// written to the cache. Retryable.
    #[error("Failed to fetch voice '{voice}': {reason}")]
    VoiceFetchFailed { voice: String, reason: String },

    /// The synthesis engine exited abnormally. Carries captured stderr.
    #[error("Synthesis failed: {0}")]
    SynthesisEngine(String),

    /// The synthesis engine exceeded the configured wait. Retryable.
    #[error("Synthesis timed out after {0}s")]
    SynthesisTimeout(u64),

    /// The requested output format is not supported, either because it is
    /// unknown or because the codec tool is unavailable on this host.
    #[error("Unsupported output format: '{0}'")]
    UnsupportedFormat(String),

    /// Filesystem failure outside any more specific stage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtsError {
    /// Stable identifier included in the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            TtsError::InvalidVoiceName(_) => "invalid_voice_name",
            TtsError::InvalidRequest(_) => "invalid_request",
            TtsError::VoiceNotFound(_) => "voice_not_found",
            TtsError::VoiceFetchFailed { .. } => "voice_fetch_failed",
            TtsError::SynthesisEngine(_) => "synthesis_engine_error",
            TtsError::SynthesisTimeout(_) => "synthesis_timeout",
            TtsError::UnsupportedFormat(_) => "unsupported_format",
            TtsError::Io(_) => "io_error",
        }
    }

    /// HTTP status code for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            TtsError::InvalidVoiceName(_) | TtsError::InvalidRequest(_) | TtsError::UnsupportedFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            TtsError::VoiceNotFound(_) => StatusCode::NOT_FOUND,
            TtsError::VoiceFetchFailed { .. } => StatusCode::BAD_GATEWAY,
            TtsError::SynthesisTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            TtsError::SynthesisEngine(_) | TtsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("❌ Request failed ({}): {}", self.kind(), self);
        } else {
            debug!("Request rejected ({}): {}", self.kind(), self);
        }

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
