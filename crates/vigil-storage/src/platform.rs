//! Platform capabilities
//!
//! The orchestrator never branches on the host platform directly. Each target
//! implements [`PlatformCapability`] once and the implementation is injected.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::Client;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use vigil_core::{PipelineError, PipelineResult};

use crate::payload::{FilePart, FileSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// Files can be fetched into memory and their declared type read
    Browser,
    /// Only a file handle is available; the HTTP client streams it from disk
    NativeHandle,
}

/// Behavioural quirks the orchestrator needs to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformTraits {
    /// Multipart uploads need the conservative retry tier
    pub strict_multipart: bool,
    /// Large media need longer timeouts
    pub extended_timeouts: bool,
}

/// Bytes fetched for inspection, with the type the source declared.
#[derive(Debug, Clone)]
pub struct FetchedBlob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait PlatformCapability: Send + Sync {
    fn kind(&self) -> PlatformKind;

    fn traits(&self) -> PlatformTraits;

    /// Fetch the file behind `uri` into memory.
    ///
    /// Returns `Ok(None)` when the platform has no byte-level access.
    async fn fetch_bytes(&self, uri: &str) -> PipelineResult<Option<FetchedBlob>>;

    /// File part that the HTTP client streams from the handle.
    fn build_file_descriptor(&self, uri: &str, mime_type: &str, file_name: &str) -> FilePart {
        FilePart {
            source: FileSource::Path(path_from_uri(uri)),
            file_name: Some(file_name.to_string()),
            mime_type: Some(mime_type.to_string()).filter(|m| !m.is_empty()),
        }
    }
}

/// Local filesystem path for a `file://` URI or bare path.
pub fn path_from_uri(uri: &str) -> PathBuf {
    let raw = uri.strip_prefix("file://").unwrap_or(uri);
    let raw = raw.split(['?', '#']).next().unwrap_or(raw);
    match urlencoding::decode(raw) {
        Ok(decoded) => PathBuf::from(decoded.into_owned()),
        Err(_) => PathBuf::from(raw),
    }
}

/// Browser-like platform: every URI can be fetched into a blob.
#[derive(Clone, Debug)]
pub struct BrowserPlatform {
    client: Client,
}

impl BrowserPlatform {
    pub fn new() -> PipelineResult<Self> {
        let client = Client::builder().build().map_err(|e| {
            PipelineError::TransportFailure(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_remote(&self, uri: &str) -> PipelineResult<FetchedBlob> {
        let response = self.client.get(uri).send().await.map_err(|e| {
            PipelineError::PayloadConstructionFailed(format!("Failed to fetch {}: {}", uri, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::PayloadConstructionFailed(format!(
                "Fetching {} returned status {}",
                uri, status
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response.bytes().await.map_err(|e| {
            PipelineError::PayloadConstructionFailed(format!("Failed to read {}: {}", uri, e))
        })?;

        Ok(FetchedBlob {
            bytes,
            content_type,
        })
    }
}

/// Decode a `data:` URI into its bytes and declared type.
pub fn decode_data_uri(uri: &str) -> PipelineResult<FetchedBlob> {
    let rest = uri.strip_prefix("data:").ok_or_else(|| {
        PipelineError::PayloadConstructionFailed("Not a data URI".to_string())
    })?;
    let (meta, data) = rest.split_once(',').ok_or_else(|| {
        PipelineError::PayloadConstructionFailed("Malformed data URI: missing ','".to_string())
    })?;

    let is_base64 = meta.ends_with(";base64");
    let mime = meta.trim_end_matches(";base64").split(';').next().unwrap_or_default();
    let content_type = Some(mime.to_string()).filter(|m| !m.is_empty());

    let bytes = if is_base64 {
        STANDARD.decode(data.trim()).map_err(|e| {
            PipelineError::PayloadConstructionFailed(format!("Invalid base64 in data URI: {}", e))
        })?
    } else {
        urlencoding::decode_binary(data.as_bytes()).into_owned()
    };

    Ok(FetchedBlob {
        bytes: Bytes::from(bytes),
        content_type,
    })
}

#[async_trait]
impl PlatformCapability for BrowserPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Browser
    }

    fn traits(&self) -> PlatformTraits {
        PlatformTraits::default()
    }

    async fn fetch_bytes(&self, uri: &str) -> PipelineResult<Option<FetchedBlob>> {
        let blob = if uri.starts_with("http://") || uri.starts_with("https://") {
            self.fetch_remote(uri).await?
        } else if uri.starts_with("data:") {
            decode_data_uri(uri)?
        } else {
            let path = path_from_uri(uri);
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                PipelineError::PayloadConstructionFailed(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?;
            FetchedBlob {
                bytes: Bytes::from(bytes),
                content_type: None,
            }
        };
        Ok(Some(blob))
    }
}

/// Native platform that exposes only file handles.
#[derive(Clone, Debug, Default)]
pub struct NativeHandlePlatform {
    traits: PlatformTraits,
}

impl NativeHandlePlatform {
    /// Native platform without multipart or timeout quirks.
    pub fn standard() -> Self {
        Self {
            traits: PlatformTraits::default(),
        }
    }

    /// Native platform with strict multipart parsing and slow large-media uploads.
    pub fn constrained() -> Self {
        Self {
            traits: PlatformTraits {
                strict_multipart: true,
                extended_timeouts: true,
            },
        }
    }
}

#[async_trait]
impl PlatformCapability for NativeHandlePlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::NativeHandle
    }

    fn traits(&self) -> PlatformTraits {
        self.traits
    }

    async fn fetch_bytes(&self, _uri: &str) -> PipelineResult<Option<FetchedBlob>> {
        Ok(None)
    }
}

/// Named platform profiles for front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformProfile {
    Browser,
    Native,
    NativeConstrained,
}

impl FromStr for PlatformProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "browser" | "web" => Ok(PlatformProfile::Browser),
            "native" => Ok(PlatformProfile::Native),
            "native-constrained" | "constrained" => Ok(PlatformProfile::NativeConstrained),
            other => Err(format!("Invalid platform profile: {}", other)),
        }
    }
}

impl PlatformProfile {
    pub fn build(self) -> PipelineResult<Arc<dyn PlatformCapability>> {
        Ok(match self {
            PlatformProfile::Browser => Arc::new(BrowserPlatform::new()?),
            PlatformProfile::Native => Arc::new(NativeHandlePlatform::standard()),
            PlatformProfile::NativeConstrained => Arc::new(NativeHandlePlatform::constrained()),
        })
    }
}
