//! Multipart payload construction
//!
//! Builds the transport-agnostic body for one upload attempt. The encoder never
//! talks to the storage service; on the browser branch it fetches the file so its
//! declared type can be inspected.

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use vigil_core::{FileRef, PipelineResult, ResourceCategory, UploadTarget};

use crate::classifier::{usable_content_type, Classification};
use crate::platform::{PlatformCapability, PlatformKind};

/// Name used for the file part when no name is derived.
const MINIMAL_FILE_NAME: &str = "upload";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// In-memory blob
    Bytes(Bytes),
    /// Streamed from disk by the HTTP client
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub source: FileSource,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// Body of one multipart POST.
///
/// Deliberately carries no Content-Type: the HTTP client generates the
/// multipart boundary header itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartPayload {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartPayload {
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// How much metadata a payload carries. Each upload tier uses one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Generated name, explicit type, destination folder
    General,
    /// Sanitized handle, canonical type, explicit `resource_type`
    Conservative,
    /// Bare file and preset only
    Minimal,
}

/// A file made ready for encoding, loaded once per pipeline run.
#[derive(Debug, Clone)]
pub enum LoadedSource {
    Blob {
        bytes: Bytes,
        declared_type: Option<String>,
    },
    Handle {
        uri: String,
    },
}

impl LoadedSource {
    /// Content type declared by the fetched blob, if any.
    pub fn declared_type(&self) -> Option<&str> {
        match self {
            LoadedSource::Blob { declared_type, .. } => declared_type.as_deref(),
            LoadedSource::Handle { .. } => None,
        }
    }
}

/// `<purpose>_<epoch-millis>[_<index>].<ext>`, where purpose is the last
/// folder segment. Original file names are never used.
pub fn generate_file_name(
    folder: &str,
    extension: &str,
    index: Option<usize>,
    now_millis: i64,
) -> String {
    let purpose = folder
        .rsplit('/')
        .find(|s| !s.is_empty())
        .map(sanitize_name_component)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "upload".to_string());

    match index {
        Some(i) => format!("{}_{}_{}.{}", purpose, now_millis, i, extension),
        None => format!("{}_{}.{}", purpose, now_millis, extension),
    }
}

fn sanitize_name_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

/// Build the upload target for a classified file.
///
/// A preferred category overrides the classifier; auto detection survives only
/// when the override agrees with the classified category.
pub fn build_target(
    classification: &Classification,
    folder: &str,
    preferred: Option<ResourceCategory>,
    index: Option<usize>,
    now_millis: i64,
) -> UploadTarget {
    let resource_category = preferred.unwrap_or(classification.category);
    UploadTarget {
        resource_category,
        mime_type: classification.mime_type.clone(),
        generated_file_name: generate_file_name(
            folder,
            &classification.extension,
            index,
            now_millis,
        ),
        destination_folder: folder.trim_matches('/').to_string(),
        auto_detect: classification.auto_detect && resource_category == classification.category,
    }
}

#[derive(Clone)]
pub struct PayloadEncoder {
    platform: Arc<dyn PlatformCapability>,
}

impl PayloadEncoder {
    pub fn new(platform: Arc<dyn PlatformCapability>) -> Self {
        Self { platform }
    }

    /// Load a file for encoding.
    ///
    /// On the browser branch this fetches the bytes; a rejected fetch is a
    /// `PayloadConstructionFailed`, distinct from any upload failure.
    pub async fn load(&self, file: &FileRef) -> PipelineResult<LoadedSource> {
        match self.platform.kind() {
            PlatformKind::Browser => {
                // Some capabilities may still decline byte access
                match self.platform.fetch_bytes(file.uri()).await? {
                    Some(blob) => Ok(LoadedSource::Blob {
                        bytes: blob.bytes,
                        declared_type: blob.content_type.filter(|t| !t.trim().is_empty()),
                    }),
                    None => Ok(LoadedSource::Handle {
                        uri: file.uri().to_string(),
                    }),
                }
            }
            PlatformKind::NativeHandle => Ok(LoadedSource::Handle {
                uri: file.uri().to_string(),
            }),
        }
    }

    /// Encode one attempt's payload.
    ///
    /// `resource_type` is only sent by the conservative shape, where it carries
    /// the endpoint segment chosen for that tier.
    pub fn encode(
        &self,
        source: &LoadedSource,
        target: &UploadTarget,
        upload_preset: &str,
        shape: PayloadShape,
        resource_type: &str,
    ) -> MultipartPayload {
        let file = self.file_part(source, target, shape);
        let mut payload = MultipartPayload {
            fields: Vec::new(),
            file: Some(file),
        }
        .text("upload_preset", upload_preset);

        if shape != PayloadShape::Minimal && !target.destination_folder.is_empty() {
            payload = payload.text("folder", target.destination_folder.as_str());
        }
        if shape == PayloadShape::Conservative {
            payload = payload.text("resource_type", resource_type);
        }
        payload
    }

    fn file_part(
        &self,
        source: &LoadedSource,
        target: &UploadTarget,
        shape: PayloadShape,
    ) -> FilePart {
        match (source, shape) {
            (LoadedSource::Blob { bytes, declared_type }, PayloadShape::General) => FilePart {
                source: FileSource::Bytes(bytes.clone()),
                file_name: Some(target.generated_file_name.clone()),
                // Re-wrap untyped or malformed blobs with the classified type
                mime_type: Some(
                    declared_type
                        .as_deref()
                        .and_then(usable_content_type)
                        .unwrap_or_else(|| target.mime_type.clone()),
                ),
            },
            (LoadedSource::Blob { bytes, .. }, PayloadShape::Conservative) => FilePart {
                source: FileSource::Bytes(bytes.clone()),
                file_name: Some(target.generated_file_name.clone()),
                mime_type: Some(target.mime_type.clone()),
            },
            (LoadedSource::Blob { bytes, .. }, PayloadShape::Minimal) => FilePart {
                source: FileSource::Bytes(bytes.clone()),
                file_name: Some(MINIMAL_FILE_NAME.to_string()),
                mime_type: None,
            },
            (LoadedSource::Handle { uri }, PayloadShape::General) => self
                .platform
                .build_file_descriptor(uri, &target.mime_type, &target.generated_file_name),
            (LoadedSource::Handle { uri }, PayloadShape::Conservative) => {
                let clean_uri = uri.split(['?', '#']).next().unwrap_or(uri);
                self.platform.build_file_descriptor(
                    clean_uri,
                    &target.mime_type,
                    &target.generated_file_name.to_ascii_lowercase(),
                )
            }
            (LoadedSource::Handle { uri }, PayloadShape::Minimal) => {
                let mut part = self.platform.build_file_descriptor(uri, "", MINIMAL_FILE_NAME);
                part.mime_type = None;
                part
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::platform::{FetchedBlob, NativeHandlePlatform, PlatformTraits};
    use async_trait::async_trait;
    use vigil_core::PipelineError;

    struct BlobPlatform {
        content_type: Option<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl PlatformCapability for BlobPlatform {
        fn kind(&self) -> PlatformKind {
            PlatformKind::Browser
        }

        fn traits(&self) -> PlatformTraits {
            PlatformTraits::default()
        }

        async fn fetch_bytes(
            &self,
            _uri: &str,
        ) -> PipelineResult<Option<crate::platform::FetchedBlob>> {
            if self.fail {
                return Err(PipelineError::PayloadConstructionFailed("fetch rejected".into()));
            }
            Ok(Some(FetchedBlob {
                bytes: Bytes::from_static(b"\xff\xd8\xff"),
                content_type: self.content_type.map(String::from),
            }))
        }
    }

    fn target_for(uri: &str, sniffed: Option<&str>) -> UploadTarget {
        let c = classify(&FileRef::new(uri), sniffed);
        build_target(&c, "report_evidence", None, None, 1_700_000_000_000)
    }

    #[test]
    fn generated_names_follow_pattern() {
        assert_eq!(
            generate_file_name("report_evidence", "mp4", None, 1_700_000_000_123),
            "report_evidence_1700000000123.mp4"
        );
        assert_eq!(
            generate_file_name("users/42/Profile Pictures", "jpg", Some(2), 5),
            "profile_pictures_5_2.jpg"
        );
        assert_eq!(generate_file_name("", "pdf", None, 7), "upload_7.pdf");
    }

    #[test]
    fn preferred_category_overrides_and_drops_auto() {
        let c = classify(&FileRef::new("file:///a/rec.3gp"), None);
        let t = build_target(&c, "report_evidence", Some(ResourceCategory::Raw), None, 1);
        assert_eq!(t.resource_category, ResourceCategory::Raw);
        assert!(!t.auto_detect);

        let t = build_target(&c, "report_evidence", Some(ResourceCategory::Video), None, 1);
        assert!(t.auto_detect);
    }

    #[tokio::test]
    async fn native_branch_builds_descriptor_without_fetching() {
        let encoder = PayloadEncoder::new(Arc::new(NativeHandlePlatform::standard()));
        let file = FileRef::new("file:///data/cache/clip.mp4");
        let source = encoder.load(&file).await.unwrap();
        assert!(matches!(source, LoadedSource::Handle { .. }));

        let target = target_for(file.uri(), None);
        let payload = encoder.encode(&source, &target, "preset", PayloadShape::General, "video");
        let part = payload.file.as_ref().unwrap();
        assert_eq!(part.source, FileSource::Path(PathBuf::from("/data/cache/clip.mp4")));
        assert_eq!(part.mime_type.as_deref(), Some("video/mp4"));
        assert_eq!(part.file_name.as_deref(), Some("report_evidence_1700000000000.mp4"));
        assert_eq!(payload.field("upload_preset"), Some("preset"));
        assert_eq!(payload.field("folder"), Some("report_evidence"));
        assert_eq!(payload.field("resource_type"), None);
    }

    #[tokio::test]
    async fn browser_branch_rewraps_untyped_blob() {
        let encoder = PayloadEncoder::new(Arc::new(BlobPlatform {
            content_type: None,
            fail: false,
        }));
        let file = FileRef::new("blob:https://app.example.com/abc");
        let source = encoder.load(&file).await.unwrap();
        let target = target_for(file.uri(), source.declared_type());
        let payload = encoder.encode(&source, &target, "preset", PayloadShape::General, "image");
        let part = payload.file.unwrap();
        assert!(matches!(part.source, FileSource::Bytes(_)));
        assert_eq!(part.mime_type.as_deref(), Some("image/jpeg"));
        assert!(part.file_name.unwrap().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn browser_branch_replaces_malformed_declared_type() {
        let encoder = PayloadEncoder::new(Arc::new(BlobPlatform {
            content_type: Some("jpeg"),
            fail: false,
        }));
        let file = FileRef::new("https://cdn.example.com/photo.jpg");
        let source = encoder.load(&file).await.unwrap();
        assert_eq!(source.declared_type(), Some("jpeg"));

        let target = target_for(file.uri(), source.declared_type());
        assert_eq!(target.mime_type, "image/jpeg");

        let payload = encoder.encode(&source, &target, "preset", PayloadShape::General, "image");
        let part = payload.file.unwrap();
        assert_eq!(part.mime_type.as_deref(), Some("image/jpeg"));
        assert!(part.file_name.unwrap().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn browser_branch_names_from_declared_type() {
        let encoder = PayloadEncoder::new(Arc::new(BlobPlatform {
            content_type: Some("audio/x-m4a"),
            fail: false,
        }));
        let file = FileRef::new("blob:https://app.example.com/abc");
        let source = encoder.load(&file).await.unwrap();
        let target = target_for(file.uri(), source.declared_type());
        assert_eq!(target.resource_category, ResourceCategory::Video);
        assert!(target.generated_file_name.ends_with(".m4a"));

        let payload = encoder.encode(&source, &target, "preset", PayloadShape::General, "video");
        assert_eq!(payload.file.unwrap().mime_type.as_deref(), Some("audio/x-m4a"));
    }

    #[tokio::test]
    async fn browser_fetch_rejection_is_payload_failure() {
        let encoder = PayloadEncoder::new(Arc::new(BlobPlatform {
            content_type: None,
            fail: true,
        }));
        let err = encoder
            .load(&FileRef::new("blob:https://app.example.com/gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PayloadConstructionFailed(_)));
    }

    #[tokio::test]
    async fn shapes_differ_in_metadata() {
        let encoder = PayloadEncoder::new(Arc::new(NativeHandlePlatform::constrained()));
        let file = FileRef::new("file:///data/cache/Voice.M4A?ts=1");
        let source = encoder.load(&file).await.unwrap();
        let target = target_for(file.uri(), None);

        let conservative =
            encoder.encode(&source, &target, "p", PayloadShape::Conservative, "auto");
        assert_eq!(conservative.field("resource_type"), Some("auto"));
        let part = conservative.file.unwrap();
        assert_eq!(part.source, FileSource::Path(PathBuf::from("/data/cache/Voice.M4A")));
        assert_eq!(part.mime_type.as_deref(), Some("audio/mp4"));

        let minimal = encoder.encode(&source, &target, "p", PayloadShape::Minimal, "image");
        assert_eq!(minimal.fields, vec![("upload_preset".to_string(), "p".to_string())]);
        let part = minimal.file.unwrap();
        assert_eq!(part.mime_type, None);
        assert_eq!(part.file_name.as_deref(), Some("upload"));
    }
}
