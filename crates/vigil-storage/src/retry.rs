//! Video retry wrapper
//!
//! Video uploads are large and fail more often on flaky networks. Instead of
//! relying on tier escalation alone, the whole pipeline is re-run from scratch
//! with exponential backoff between attempts.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vigil_core::{
    ErrorMetadata, FileRef, PipelineError, PipelineResult, ResourceCategory, RetryPolicy,
    UploadOutcome,
};

use crate::orchestrator::{RunOptions, UploadOrchestrator};

/// Wait before the next attempt: `min(base * 2^(attempt-1), max)`.
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    policy
        .base_delay
        .saturating_mul(1u32 << exponent)
        .min(policy.max_delay)
}

impl UploadOrchestrator {
    /// Upload a video with full-pipeline retries.
    #[tracing::instrument(skip_all, fields(folder = %folder))]
    pub async fn upload_video(&self, file: &FileRef, folder: &str) -> UploadOutcome {
        self.retry_video(file, folder, None).await.into()
    }

    #[tracing::instrument(skip_all, fields(folder = %folder))]
    pub async fn upload_video_with_cancel(
        &self,
        file: &FileRef,
        folder: &str,
        cancel: &CancellationToken,
    ) -> UploadOutcome {
        self.retry_video(file, folder, Some(cancel)).await.into()
    }

    async fn retry_video(
        &self,
        file: &FileRef,
        folder: &str,
        cancel: Option<&CancellationToken>,
    ) -> PipelineResult<String> {
        let policy = self.config.retry();
        let max_attempts = policy.max_attempts.max(1);
        let options = RunOptions {
            preferred: Some(ResourceCategory::Video),
            index: None,
            timeout_floor: Some(
                self.config
                    .timeouts()
                    .video_floor_for(self.platform.traits().extended_timeouts),
            ),
        };

        let mut attempt = 1;
        loop {
            let err = match self.run_pipeline(file, folder, options, cancel).await {
                Ok(url) => return Ok(url),
                Err(e) => e,
            };

            if !err.is_recoverable() || attempt >= max_attempts {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error_code = err.error_code(),
                    error = %err,
                    "Video upload failed"
                );
                return Err(err);
            }

            let delay = backoff_delay(attempt, policy);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Video upload attempt failed, retrying"
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => return Err(PipelineError::Cancelled),
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            attempt += 1;
        }
    }
}
