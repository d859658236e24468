//! Configuration module
//!
//! The pipeline holds its own [`StorageConfig`] value instead of reading ambient
//! globals. Values come from the environment (`.env` is honoured via dotenvy) or
//! are injected directly by embedders and tests.

use std::env;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::constants::DEFAULT_API_BASE_URL;
use crate::error::PipelineError;
use crate::models::ResourceCategory;

const PRIMARY_TIMEOUT_SECS: u64 = 60;
const PRIMARY_EXTENDED_TIMEOUT_SECS: u64 = 90;
const SPECIALIZED_VIDEO_TIMEOUT_SECS: u64 = 120;
const SPECIALIZED_RAW_TIMEOUT_SECS: u64 = 90;
const SPECIALIZED_IMAGE_TIMEOUT_SECS: u64 = 60;
const VIDEO_ATTEMPT_FLOOR_SECS: u64 = 120;
const VIDEO_ATTEMPT_EXTENDED_FLOOR_SECS: u64 = 180;
const VIDEO_MAX_ATTEMPTS: u32 = 2;
const BACKOFF_BASE_MS: u64 = 1000;
const BACKOFF_CAP_MS: u64 = 5000;

/// Per-attempt timeouts for each upload tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub primary: Duration,
    /// Primary timeout on platforms that need more time for large media
    pub primary_extended: Duration,
    pub specialized_video: Duration,
    pub specialized_raw: Duration,
    pub specialized_image: Duration,
    /// Floor applied to every tier while running under the video retry wrapper
    pub video_attempt_floor: Duration,
    pub video_attempt_extended_floor: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            primary: Duration::from_secs(PRIMARY_TIMEOUT_SECS),
            primary_extended: Duration::from_secs(PRIMARY_EXTENDED_TIMEOUT_SECS),
            specialized_video: Duration::from_secs(SPECIALIZED_VIDEO_TIMEOUT_SECS),
            specialized_raw: Duration::from_secs(SPECIALIZED_RAW_TIMEOUT_SECS),
            specialized_image: Duration::from_secs(SPECIALIZED_IMAGE_TIMEOUT_SECS),
            video_attempt_floor: Duration::from_secs(VIDEO_ATTEMPT_FLOOR_SECS),
            video_attempt_extended_floor: Duration::from_secs(VIDEO_ATTEMPT_EXTENDED_FLOOR_SECS),
        }
    }
}

impl TimeoutPolicy {
    pub fn primary_for(&self, extended: bool) -> Duration {
        if extended {
            self.primary_extended
        } else {
            self.primary
        }
    }

    pub fn specialized_for(&self, category: ResourceCategory) -> Duration {
        match category {
            ResourceCategory::Video => self.specialized_video,
            ResourceCategory::Raw => self.specialized_raw,
            ResourceCategory::Image => self.specialized_image,
        }
    }

    pub fn video_floor_for(&self, extended: bool) -> Duration {
        if extended {
            self.video_attempt_extended_floor
        } else {
            self.video_attempt_floor
        }
    }
}

/// Outer retry loop settings for video uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: VIDEO_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BACKOFF_BASE_MS),
            max_delay: Duration::from_millis(BACKOFF_CAP_MS),
        }
    }
}

/// Storage service configuration.
#[derive(Clone)]
pub struct StorageConfig {
    cloud_name: Option<String>,
    upload_preset: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    api_base_url: String,
    timeouts: TimeoutPolicy,
    retry: RetryPolicy,
}

impl Debug for StorageConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StorageConfig")
            .field("cloud_name", &self.cloud_name)
            .field("upload_preset", &self.upload_preset)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("timeouts", &self.timeouts)
            .field("retry", &self.retry)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_opt(key: &str) -> Option<String> {
    non_empty(env::var(key).ok())
}

impl StorageConfig {
    /// Configuration with only the upload credentials set.
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            cloud_name: non_empty(Some(cloud_name.into())),
            upload_preset: non_empty(Some(upload_preset.into())),
            api_key: None,
            api_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeouts: TimeoutPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Missing credentials are not an error here: upload and deletion report
    /// `ConfigMissing` at call time for the values they need.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut timeouts = TimeoutPolicy::default();
        timeouts.primary = Duration::from_secs(
            env::var("UPLOAD_PRIMARY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(PRIMARY_TIMEOUT_SECS),
        );
        timeouts.primary_extended = Duration::from_secs(
            env::var("UPLOAD_PRIMARY_EXTENDED_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(PRIMARY_EXTENDED_TIMEOUT_SECS),
        );

        let retry = RetryPolicy {
            max_attempts: env::var("UPLOAD_VIDEO_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(VIDEO_MAX_ATTEMPTS),
            ..RetryPolicy::default()
        };

        Self {
            cloud_name: env_opt("CLOUDINARY_CLOUD_NAME"),
            upload_preset: env_opt("CLOUDINARY_UPLOAD_PRESET"),
            api_key: env_opt("CLOUDINARY_API_KEY"),
            api_secret: env_opt("CLOUDINARY_API_SECRET"),
            api_base_url: env_opt("CLOUDINARY_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            timeouts,
            retry,
        }
    }

    pub fn with_api_credentials(
        mut self,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        self.api_key = non_empty(Some(api_key.into()));
        self.api_secret = non_empty(Some(api_secret.into()));
        self
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cloud_name(&self) -> Option<&str> {
        self.cloud_name.as_deref()
    }

    pub fn upload_preset(&self) -> Option<&str> {
        self.upload_preset.as_deref()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_deref()
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Cloud name and upload preset, or `ConfigMissing`.
    pub fn upload_credentials(&self) -> Result<(&str, &str), PipelineError> {
        let cloud = self.cloud_name().ok_or_else(|| {
            PipelineError::ConfigMissing("CLOUDINARY_CLOUD_NAME not configured".to_string())
        })?;
        let preset = self.upload_preset().ok_or_else(|| {
            PipelineError::ConfigMissing("CLOUDINARY_UPLOAD_PRESET not configured".to_string())
        })?;
        Ok((cloud, preset))
    }

    /// Cloud name, API key and API secret, or `ConfigMissing`.
    pub fn deletion_credentials(&self) -> Result<(&str, &str, &str), PipelineError> {
        let cloud = self.cloud_name().ok_or_else(|| {
            PipelineError::ConfigMissing("CLOUDINARY_CLOUD_NAME not configured".to_string())
        })?;
        let key = self.api_key().ok_or_else(|| {
            PipelineError::ConfigMissing("CLOUDINARY_API_KEY not configured".to_string())
        })?;
        let secret = self.api_secret().ok_or_else(|| {
            PipelineError::ConfigMissing("CLOUDINARY_API_SECRET not configured".to_string())
        })?;
        Ok((cloud, key, secret))
    }

    /// `{base}/{cloud}/{segment}/{action}`
    pub fn endpoint(&self, cloud_name: &str, segment: &str, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.api_base_url.trim_end_matches('/'),
            cloud_name,
            segment,
            action
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policies_match_documented_constants() {
        let t = TimeoutPolicy::default();
        assert_eq!(t.primary_for(false), Duration::from_secs(60));
        assert_eq!(t.primary_for(true), Duration::from_secs(90));
        assert_eq!(t.specialized_for(ResourceCategory::Video), Duration::from_secs(120));
        assert_eq!(t.specialized_for(ResourceCategory::Raw), Duration::from_secs(90));
        assert_eq!(t.specialized_for(ResourceCategory::Image), Duration::from_secs(60));
        assert_eq!(t.video_floor_for(true), Duration::from_secs(180));
        assert_eq!(t.video_floor_for(false), Duration::from_secs(120));

        let r = RetryPolicy::default();
        assert_eq!(r.max_attempts, 2);
        assert_eq!(r.base_delay, Duration::from_millis(1000));
        assert_eq!(r.max_delay, Duration::from_millis(5000));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = StorageConfig::new("", "preset");
        let err = config.upload_credentials().unwrap_err();
        assert!(matches!(err, PipelineError::ConfigMissing(_)));
    }

    #[test]
    fn deletion_needs_api_credentials() {
        let config = StorageConfig::new("demo", "preset");
        assert!(config.upload_credentials().is_ok());
        assert!(matches!(
            config.deletion_credentials(),
            Err(PipelineError::ConfigMissing(_))
        ));

        let config = config.with_api_credentials("key", "secret");
        assert_eq!(config.deletion_credentials().unwrap(), ("demo", "key", "secret"));
    }

    #[test]
    fn endpoint_joins_segments() {
        let config = StorageConfig::new("demo", "preset").with_api_base_url("http://127.0.0.1:9/");
        assert_eq!(
            config.endpoint("demo", "video", "upload"),
            "http://127.0.0.1:9/demo/video/upload"
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = StorageConfig::new("demo", "preset").with_api_credentials("key-123", "s3cr3t");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("key-123"));
        assert!(debug.contains("demo"));
    }
}
