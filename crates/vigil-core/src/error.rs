//! Error types module
//!
//! Every failure the upload and deletion pipeline can hit is a [`PipelineError`].
//! Errors never cross the public contract as `Err`: the pipeline converts them into
//! an [`UploadOutcome`](crate::models::UploadOutcome) carrying an [`ErrorKind`] and a
//! message, so callers branch on `outcome.success` alone.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a caller cancelling
    Debug,
    /// Warning level - for recoverable issues like a single failed tier
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported and handled.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_FAILURE")
    fn error_code(&self) -> &'static str;

    /// Whether a full clean retry of the operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Caller-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Error kind as carried in outcomes. This is the data form of the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigMissing,
    PayloadConstructionFailed,
    Timeout,
    TransportFailure,
    ServiceRejected,
    Cancelled,
    UrlUnparseable,
    /// Generic internal failure. Internal invariant violations surface as this.
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            ErrorKind::ConfigMissing => "config_missing",
            ErrorKind::PayloadConstructionFailed => "payload_construction_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::ServiceRejected => "service_rejected",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::UrlUnparseable => "url_unparseable",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Payload construction failed: {0}")]
    PayloadConstructionFailed(String),

    #[error("Upload timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Service rejected request ({status}): {message}")]
    ServiceRejected { status: u16, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Signature invariant violated: {0}")]
    SignatureInvariantViolation(String),

    #[error("URL is not a managed storage URL: {0}")]
    UrlUnparseable(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::ConfigMissing(_) => ErrorKind::ConfigMissing,
            PipelineError::PayloadConstructionFailed(_) => ErrorKind::PayloadConstructionFailed,
            PipelineError::Timeout(_) => ErrorKind::Timeout,
            PipelineError::TransportFailure(_) => ErrorKind::TransportFailure,
            PipelineError::ServiceRejected { .. } => ErrorKind::ServiceRejected,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::SignatureInvariantViolation(_) => ErrorKind::Internal,
            PipelineError::UrlUnparseable(_) => ErrorKind::UrlUnparseable,
        }
    }

    /// Whether the orchestrator should move on to the next upload tier.
    ///
    /// Missing configuration, cancellation and payload construction failures
    /// end the tier chain: no later tier can fix them.
    pub fn escalates_to_next_tier(&self) -> bool {
        !matches!(
            self,
            PipelineError::ConfigMissing(_)
                | PipelineError::Cancelled
                | PipelineError::PayloadConstructionFailed(_)
        )
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn pipeline_error_static_metadata(err: &PipelineError) -> (&'static str, bool, LogLevel) {
    match err {
        PipelineError::ConfigMissing(_) => ("CONFIG_MISSING", false, LogLevel::Error),
        PipelineError::PayloadConstructionFailed(_) => {
            ("PAYLOAD_CONSTRUCTION_FAILED", true, LogLevel::Warn)
        }
        PipelineError::Timeout(_) => ("TIMEOUT", true, LogLevel::Warn),
        PipelineError::TransportFailure(_) => ("TRANSPORT_FAILURE", true, LogLevel::Warn),
        PipelineError::ServiceRejected { .. } => ("SERVICE_REJECTED", true, LogLevel::Warn),
        PipelineError::Cancelled => ("CANCELLED", false, LogLevel::Debug),
        PipelineError::SignatureInvariantViolation(_) => {
            ("SIGNATURE_INVARIANT_VIOLATION", false, LogLevel::Error)
        }
        PipelineError::UrlUnparseable(_) => ("URL_UNPARSEABLE", false, LogLevel::Debug),
    }
}

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        pipeline_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        pipeline_error_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        match self {
            // Never leak internal invariant details to callers
            PipelineError::SignatureInvariantViolation(_) => {
                "Deletion failed: could not sign request".to_string()
            }
            PipelineError::ServiceRejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        pipeline_error_static_metadata(self).2
    }
}
