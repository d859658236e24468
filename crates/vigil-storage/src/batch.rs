//! Batch uploads
//!
//! Every file gets its own pipeline; pipelines share nothing mutable and one
//! failure never affects its siblings.

use futures::future::join_all;
use vigil_core::{BatchOutcome, FileRef};

use crate::orchestrator::UploadOrchestrator;

#[derive(Clone)]
pub struct BatchCoordinator {
    orchestrator: UploadOrchestrator,
}

impl BatchCoordinator {
    pub fn new(orchestrator: UploadOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Upload all files concurrently. Outcomes keep input order.
    #[tracing::instrument(skip_all, fields(folder = %folder, count = files.len()))]
    pub async fn upload_many(&self, files: &[FileRef], folder: &str) -> BatchOutcome {
        let uploads = files
            .iter()
            .enumerate()
            .map(|(index, file)| self.orchestrator.upload_indexed(file, folder, index));

        let batch = BatchOutcome::from_outcomes(join_all(uploads).await);

        if batch.all_succeeded() {
            tracing::info!(succeeded = batch.succeeded, "Batch upload complete");
        } else {
            tracing::warn!(
                succeeded = batch.succeeded,
                failed = batch.failed,
                "Batch upload completed with failures"
            );
        }
        batch
    }
}
