use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ErrorMetadata, PipelineError};

/// Normalized result of one upload or deletion call.
///
/// On upload success `url` is the canonical delivery URL and the only value the
/// application persists; it alone is enough to delete the object later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UploadOutcome {
    pub fn uploaded(url: impl Into<String>) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            error_kind: None,
            error_message: None,
        }
    }

    /// Successful deletion: no URL.
    pub fn deleted() -> Self {
        Self {
            success: true,
            url: None,
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }
}

impl From<PipelineError> for UploadOutcome {
    fn from(err: PipelineError) -> Self {
        UploadOutcome::failed(err.kind(), err.client_message())
    }
}

impl From<Result<String, PipelineError>> for UploadOutcome {
    fn from(result: Result<String, PipelineError>) -> Self {
        match result {
            Ok(url) => UploadOutcome::uploaded(url),
            Err(err) => err.into(),
        }
    }
}

/// Per-file outcomes of a batch upload, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub outcomes: Vec<UploadOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn from_outcomes(outcomes: Vec<UploadOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        Self {
            outcomes,
            succeeded,
            failed,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Successful URLs in input order.
    pub fn urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.url.as_deref())
            .collect()
    }

    /// Short message suitable for showing to the user.
    pub fn summary_message(&self) -> String {
        let total = self.outcomes.len();
        if self.failed == 0 {
            format!("{} of {} files uploaded", self.succeeded, total)
        } else {
            format!(
                "{} of {} files uploaded, {} failed",
                self.succeeded, total, self.failed
            )
        }
    }
}
