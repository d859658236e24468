//! Upload orchestration
//!
//! One upload is a short pipeline: classify, load, then run an ordered list of
//! tiers until one succeeds. Tiers are data ([`plan_tiers`]); each tier differs
//! only in how the payload is built and how long the attempt may take.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vigil_core::{
    ErrorMetadata, FileRef, LogLevel, MediaKind, PipelineError, PipelineResult, ResourceCategory,
    StorageConfig, UploadOutcome, UploadTarget,
};

use crate::classifier::classify;
use crate::payload::{build_target, PayloadEncoder, PayloadShape};
use crate::platform::{PlatformCapability, PlatformTraits};
use crate::signer::parse_delivery_url;
use crate::transport::{parse_upload_response, StorageTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    /// Conservative payload for platforms with strict multipart parsing
    PlatformSpecialized,
    /// Bare payload, images only
    SimpleFallback,
}

impl Tier {
    pub fn shape(self) -> PayloadShape {
        match self {
            Tier::Primary => PayloadShape::General,
            Tier::PlatformSpecialized => PayloadShape::Conservative,
            Tier::SimpleFallback => PayloadShape::Minimal,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Primary => "primary",
            Tier::PlatformSpecialized => "platform_specialized",
            Tier::SimpleFallback => "simple_fallback",
        }
    }
}

/// Ordered tiers for one upload.
///
/// Video and raw uploads never reach the simple fallback.
pub fn plan_tiers(category: ResourceCategory, traits: PlatformTraits) -> Vec<Tier> {
    let mut tiers = vec![Tier::Primary];
    if traits.strict_multipart {
        tiers.push(Tier::PlatformSpecialized);
    }
    if category == ResourceCategory::Image {
        tiers.push(Tier::SimpleFallback);
    }
    tiers
}

/// Per-call knobs for one pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunOptions {
    pub preferred: Option<ResourceCategory>,
    pub index: Option<usize>,
    /// Minimum per-tier timeout
    pub timeout_floor: Option<Duration>,
}

/// Runs the tiered upload pipeline against one storage account.
#[derive(Clone)]
pub struct UploadOrchestrator {
    pub(crate) config: Arc<StorageConfig>,
    pub(crate) platform: Arc<dyn PlatformCapability>,
    transport: Arc<dyn StorageTransport>,
    encoder: PayloadEncoder,
}

impl UploadOrchestrator {
    pub fn new(
        config: Arc<StorageConfig>,
        platform: Arc<dyn PlatformCapability>,
        transport: Arc<dyn StorageTransport>,
    ) -> Self {
        let encoder = PayloadEncoder::new(platform.clone());
        Self {
            config,
            platform,
            transport,
            encoder,
        }
    }

    /// Upload one file. Never returns an error; failures are carried in the outcome.
    #[tracing::instrument(skip_all, fields(folder = %folder, preferred = ?preferred))]
    pub async fn upload(
        &self,
        file: &FileRef,
        folder: &str,
        preferred: Option<ResourceCategory>,
    ) -> UploadOutcome {
        let options = RunOptions {
            preferred,
            ..RunOptions::default()
        };
        self.run_pipeline(file, folder, options, None).await.into()
    }

    /// Upload one file, checking `cancel` before every network call.
    #[tracing::instrument(skip_all, fields(folder = %folder, preferred = ?preferred))]
    pub async fn upload_with_cancel(
        &self,
        file: &FileRef,
        folder: &str,
        preferred: Option<ResourceCategory>,
        cancel: &CancellationToken,
    ) -> UploadOutcome {
        let options = RunOptions {
            preferred,
            ..RunOptions::default()
        };
        self.run_pipeline(file, folder, options, Some(cancel)).await.into()
    }

    /// Upload one file of a batch; `index` keeps generated names unique.
    pub async fn upload_indexed(
        &self,
        file: &FileRef,
        folder: &str,
        index: usize,
    ) -> UploadOutcome {
        let options = RunOptions {
            index: Some(index),
            ..RunOptions::default()
        };
        self.run_pipeline(file, folder, options, None).await.into()
    }

    fn tier_timeout(
        &self,
        tier: Tier,
        category: ResourceCategory,
        floor: Option<Duration>,
    ) -> Duration {
        let timeouts = self.config.timeouts();
        let extended = self.platform.traits().extended_timeouts;
        let base = match tier {
            Tier::Primary | Tier::SimpleFallback => timeouts.primary_for(extended),
            Tier::PlatformSpecialized => timeouts.specialized_for(category),
        };
        floor.map_or(base, |f| base.max(f))
    }

    /// Endpoint segment for a tier. The specialized tier negotiates `auto` for audio.
    fn tier_segment(tier: Tier, target: &UploadTarget, media_kind: MediaKind) -> &'static str {
        match tier {
            Tier::Primary => target.endpoint_segment(),
            Tier::PlatformSpecialized => {
                if media_kind == MediaKind::Audio || target.auto_detect {
                    "auto"
                } else {
                    target.resource_category.as_str()
                }
            }
            Tier::SimpleFallback => ResourceCategory::Image.as_str(),
        }
    }

    pub(crate) async fn run_pipeline(
        &self,
        file: &FileRef,
        folder: &str,
        options: RunOptions,
        cancel: Option<&CancellationToken>,
    ) -> PipelineResult<String> {
        let is_cancelled = || cancel.is_some_and(|c| c.is_cancelled());
        if is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let (cloud_name, upload_preset) = self.config.upload_credentials()?;

        let source = self.encoder.load(file).await?;
        let classification = classify(file, source.declared_type());
        let target = build_target(
            &classification,
            folder,
            options.preferred,
            options.index,
            chrono::Utc::now().timestamp_millis(),
        );

        tracing::debug!(
            category = %target.resource_category,
            mime_type = %target.mime_type,
            file_name = %target.generated_file_name,
            source = ?classification.source,
            "File classified"
        );

        let tiers = plan_tiers(target.resource_category, self.platform.traits());
        let mut last_error = None;

        for tier in tiers {
            if is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let segment = Self::tier_segment(tier, &target, classification.media_kind);
            let payload = self
                .encoder
                .encode(&source, &target, upload_preset, tier.shape(), segment);
            let url = self.config.endpoint(cloud_name, segment, "upload");
            let limit = self.tier_timeout(tier, target.resource_category, options.timeout_floor);

            tracing::debug!(
                tier = tier.name(),
                endpoint = %url,
                timeout_secs = limit.as_secs(),
                "Attempting upload tier"
            );

            // A response arriving after the timeout is dropped with the future
            let attempt = self.transport.post_multipart(&url, payload);
            let result = match tokio::time::timeout(limit, attempt).await {
                Ok(Ok(response)) => parse_upload_response(&response),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(PipelineError::Timeout(limit)),
            };

            match result {
                Ok(delivery_url) => {
                    if let Err(e) = parse_delivery_url(&delivery_url, cloud_name) {
                        tracing::warn!(
                            error = %e,
                            "Uploaded URL cannot be parsed for later deletion"
                        );
                    }
                    tracing::info!(tier = tier.name(), url = %delivery_url, "Upload succeeded");
                    return Ok(delivery_url);
                }
                Err(e) => {
                    log_tier_failure(tier, &e);
                    if !e.escalates_to_next_tier() {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PipelineError::TransportFailure("No upload tier was attempted".to_string())
        }))
    }
}

fn log_tier_failure(tier: Tier, err: &PipelineError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(tier = tier.name(), error = %err, "Upload tier stopped"),
        LogLevel::Warn => tracing::warn!(
            tier = tier.name(),
            error_code = err.error_code(),
            error = %err,
            "Upload tier failed"
        ),
        LogLevel::Error => tracing::error!(
            tier = tier.name(),
            error_code = err.error_code(),
            error = %err,
            "Upload tier failed"
        ),
    }
}
