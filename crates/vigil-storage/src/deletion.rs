//! Deletion by delivery URL. One signed attempt; callers retry if they need to.

use serde::Deserialize;
use std::sync::Arc;
use vigil_core::constants::DESTROY_OK;
use vigil_core::{PipelineError, PipelineResult, StorageConfig, UploadOutcome};

use crate::signer::{parse_delivery_url, DeletionRequest};
use crate::transport::{rejection, StorageTransport};

#[derive(Debug, Deserialize)]
struct DestroyResponseBody {
    result: Option<String>,
}

#[derive(Clone)]
pub struct DeletionClient {
    config: Arc<StorageConfig>,
    transport: Arc<dyn StorageTransport>,
}

impl DeletionClient {
    pub fn new(config: Arc<StorageConfig>, transport: Arc<dyn StorageTransport>) -> Self {
        Self { config, transport }
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    pub async fn delete_by_url(&self, url: &str) -> UploadOutcome {
        match self.destroy(url).await {
            Ok(()) => {
                tracing::info!("Asset deleted");
                UploadOutcome::deleted()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Deletion failed");
                e.into()
            }
        }
    }

    async fn destroy(&self, url: &str) -> PipelineResult<()> {
        let (cloud_name, api_key, api_secret) = self.config.deletion_credentials()?;
        let asset = parse_delivery_url(url, cloud_name)?;
        let endpoint = self
            .config
            .endpoint(cloud_name, asset.resource_category.as_str(), "destroy");

        tracing::debug!(
            public_id = %asset.public_id,
            category = %asset.resource_category,
            "Deleting asset"
        );

        let request = DeletionRequest::new(
            asset,
            chrono::Utc::now().timestamp(),
            api_key,
            api_secret,
        )?;

        let limit = self.config.timeouts().primary;
        let response = tokio::time::timeout(
            limit,
            self.transport.post_multipart(&endpoint, request.into_payload()),
        )
        .await
        .map_err(|_| PipelineError::Timeout(limit))??;

        if !response.is_success() {
            return Err(rejection(&response));
        }

        let body: DestroyResponseBody = serde_json::from_str(&response.body).map_err(|e| {
            PipelineError::ServiceRejected {
                status: response.status,
                message: format!("Unreadable deletion response: {}", e),
            }
        })?;

        match body.result.as_deref() {
            Some(DESTROY_OK) => Ok(()),
            other => Err(PipelineError::ServiceRejected {
                status: response.status,
                message: format!("Deletion failed: {}", other.unwrap_or("no result")),
            }),
        }
    }
}
