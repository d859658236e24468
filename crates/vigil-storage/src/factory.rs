use crate::pipeline::MediaPipeline;
use crate::platform::PlatformProfile;
use crate::transport::{HttpTransport, StorageTransport};
use std::sync::Arc;
use vigil_core::{PipelineResult, StorageConfig};

/// Create a pipeline for a platform profile, talking HTTP to the storage service.
pub fn create_pipeline(
    config: StorageConfig,
    profile: PlatformProfile,
) -> PipelineResult<MediaPipeline> {
    let transport = HttpTransport::new()?;
    create_pipeline_with_transport(config, profile, Arc::new(transport))
}

/// Create a pipeline with a caller-provided transport.
pub fn create_pipeline_with_transport(
    config: StorageConfig,
    profile: PlatformProfile,
    transport: Arc<dyn StorageTransport>,
) -> PipelineResult<MediaPipeline> {
    let platform = profile.build()?;
    tracing::debug!(
        platform = ?platform.kind(),
        strict_multipart = platform.traits().strict_multipart,
        extended_timeouts = platform.traits().extended_timeouts,
        "Creating media pipeline"
    );
    Ok(MediaPipeline::new(config, platform, transport))
}
