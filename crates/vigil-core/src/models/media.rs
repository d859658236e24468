use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Media kind enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Storage bucket this kind is transported under.
    ///
    /// The storage service has no audio bucket; audio travels as video.
    pub fn resource_category(self) -> ResourceCategory {
        match self {
            MediaKind::Image => ResourceCategory::Image,
            MediaKind::Video | MediaKind::Audio => ResourceCategory::Video,
            MediaKind::Document => ResourceCategory::Raw,
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// Top-level bucket of the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Image,
    /// Video and audio
    Video,
    Raw,
}

impl ResourceCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceCategory::Image => "image",
            ResourceCategory::Video => "video",
            ResourceCategory::Raw => "raw",
        }
    }
}

impl FromStr for ResourceCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(ResourceCategory::Image),
            "video" => Ok(ResourceCategory::Video),
            "raw" => Ok(ResourceCategory::Raw),
            _ => Err(anyhow::anyhow!("Invalid resource category: {}", s)),
        }
    }
}

impl Display for ResourceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Local reference to a captured or picked file.
///
/// Immutable once created; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    uri: String,
    size: Option<u64>,
    mime_hint: Option<String>,
}

impl FileRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            size: None,
            mime_hint: None,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        if !mime.trim().is_empty() {
            self.mime_hint = Some(mime.trim().to_lowercase());
        }
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn mime_hint(&self) -> Option<&str> {
        self.mime_hint.as_deref()
    }
}

/// Where and how one file is sent. Derived per upload, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub resource_category: ResourceCategory,
    pub mime_type: String,
    pub generated_file_name: String,
    pub destination_folder: String,
    /// Let the storage service infer the category (`auto` endpoint)
    pub auto_detect: bool,
}

impl UploadTarget {
    /// Endpoint path segment: the category, or `auto` when detection is deferred.
    pub fn endpoint_segment(&self) -> &'static str {
        if self.auto_detect {
            "auto"
        } else {
            self.resource_category.as_str()
        }
    }
}
