//! Media pipeline facade
//!
//! [`MediaPipeline`] is what screens and collaborators hold: a value owning its
//! configuration, platform capability and transport. Every operation resolves to
//! an [`UploadOutcome`] or [`BatchOutcome`]; nothing returns `Err`.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use vigil_core::constants::{PROFILE_PICTURE_FOLDER, REPORT_EVIDENCE_FOLDER};
use vigil_core::{BatchOutcome, FileRef, ResourceCategory, StorageConfig, UploadOutcome};

use crate::batch::BatchCoordinator;
use crate::deletion::DeletionClient;
use crate::orchestrator::UploadOrchestrator;
use crate::platform::PlatformCapability;
use crate::transport::StorageTransport;

#[derive(Clone)]
pub struct MediaPipeline {
    orchestrator: UploadOrchestrator,
    batch: BatchCoordinator,
    deletion: DeletionClient,
}

impl MediaPipeline {
    pub fn new(
        config: StorageConfig,
        platform: Arc<dyn PlatformCapability>,
        transport: Arc<dyn StorageTransport>,
    ) -> Self {
        let config = Arc::new(config);
        let orchestrator = UploadOrchestrator::new(config.clone(), platform, transport.clone());
        Self {
            batch: BatchCoordinator::new(orchestrator.clone()),
            deletion: DeletionClient::new(config, transport),
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &UploadOrchestrator {
        &self.orchestrator
    }

    pub async fn upload(&self, file: &FileRef, folder: &str) -> UploadOutcome {
        self.orchestrator.upload(file, folder, None).await
    }

    /// Upload with the category forced instead of classified.
    pub async fn upload_as(
        &self,
        file: &FileRef,
        folder: &str,
        category: ResourceCategory,
    ) -> UploadOutcome {
        self.orchestrator.upload(file, folder, Some(category)).await
    }

    pub async fn upload_with_cancel(
        &self,
        file: &FileRef,
        folder: &str,
        cancel: &CancellationToken,
    ) -> UploadOutcome {
        self.orchestrator
            .upload_with_cancel(file, folder, None, cancel)
            .await
    }

    pub async fn upload_video(&self, file: &FileRef, folder: &str) -> UploadOutcome {
        self.orchestrator.upload_video(file, folder).await
    }

    pub async fn upload_many(&self, files: &[FileRef], folder: &str) -> BatchOutcome {
        self.batch.upload_many(files, folder).await
    }

    /// Upload evidence attached to a report.
    pub async fn upload_evidence(&self, file: &FileRef) -> UploadOutcome {
        self.upload(file, REPORT_EVIDENCE_FOLDER).await
    }

    pub async fn upload_profile_picture(&self, file: &FileRef) -> UploadOutcome {
        self.orchestrator
            .upload(file, PROFILE_PICTURE_FOLDER, Some(ResourceCategory::Image))
            .await
    }

    pub async fn delete_by_url(&self, url: &str) -> UploadOutcome {
        self.deletion.delete_by_url(url).await
    }
}
