//! File classification
//!
//! Decides the media kind, storage category and transport MIME type of a file.
//! Classification never fails: a wrong guess only costs a tier fallback.

use vigil_core::constants::{FALLBACK_EXTENSION, FALLBACK_MIME_TYPE};
use vigil_core::{FileRef, MediaKind, ResourceCategory};

/// Extension -> (MIME type, kind). Source of truth in both directions.
const EXTENSION_TABLE: &[(&str, &str, MediaKind)] = &[
    // Images
    ("jpg", "image/jpeg", MediaKind::Image),
    ("jpeg", "image/jpeg", MediaKind::Image),
    ("png", "image/png", MediaKind::Image),
    ("gif", "image/gif", MediaKind::Image),
    ("webp", "image/webp", MediaKind::Image),
    ("bmp", "image/bmp", MediaKind::Image),
    ("svg", "image/svg+xml", MediaKind::Image),
    ("tiff", "image/tiff", MediaKind::Image),
    ("ico", "image/x-icon", MediaKind::Image),
    ("heic", "image/heic", MediaKind::Image),
    // Videos
    ("mp4", "video/mp4", MediaKind::Video),
    ("mov", "video/quicktime", MediaKind::Video),
    ("avi", "video/x-msvideo", MediaKind::Video),
    ("webm", "video/webm", MediaKind::Video),
    ("flv", "video/x-flv", MediaKind::Video),
    ("wmv", "video/x-ms-wmv", MediaKind::Video),
    ("3gp", "video/3gpp", MediaKind::Video),
    ("mkv", "video/x-matroska", MediaKind::Video),
    ("m4v", "video/x-m4v", MediaKind::Video),
    // Audio
    ("mp3", "audio/mpeg", MediaKind::Audio),
    ("wav", "audio/wav", MediaKind::Audio),
    ("aac", "audio/aac", MediaKind::Audio),
    ("ogg", "audio/ogg", MediaKind::Audio),
    ("flac", "audio/flac", MediaKind::Audio),
    ("m4a", "audio/mp4", MediaKind::Audio),
    ("wma", "audio/x-ms-wma", MediaKind::Audio),
    ("opus", "audio/opus", MediaKind::Audio),
    ("amr", "audio/amr", MediaKind::Audio),
    // Documents
    ("pdf", "application/pdf", MediaKind::Document),
    ("doc", "application/msword", MediaKind::Document),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        MediaKind::Document,
    ),
    ("txt", "text/plain", MediaKind::Document),
    ("rtf", "application/rtf", MediaKind::Document),
    ("xls", "application/vnd.ms-excel", MediaKind::Document),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        MediaKind::Document,
    ),
    ("ppt", "application/vnd.ms-powerpoint", MediaKind::Document),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        MediaKind::Document,
    ),
    ("csv", "text/csv", MediaKind::Document),
];

/// Non-canonical MIME spellings seen from pickers and browsers.
const MIME_ALIASES: &[(&str, &str)] = &[
    ("image/jpg", "jpg"),
    ("image/pjpeg", "jpg"),
    ("image/x-ms-bmp", "bmp"),
    ("image/vnd.microsoft.icon", "ico"),
    ("audio/mp3", "mp3"),
    ("audio/x-wav", "wav"),
    ("audio/wave", "wav"),
    ("audio/x-m4a", "m4a"),
    ("audio/3gpp", "3gp"),
    ("audio/x-flac", "flac"),
    ("application/ogg", "ogg"),
    ("video/3gp", "3gp"),
    ("text/comma-separated-values", "csv"),
];

/// Containers shared by audio and video: the storage service picks the category.
const AMBIGUOUS_EXTENSIONS: &[&str] = &["3gp", "ogg"];

const DOCUMENT_MARKERS: &[&str] = &[
    "document",
    "pdf",
    "msword",
    "officedocument",
    "spreadsheet",
    "presentation",
];

/// How a classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Inspected,
    MimeHint,
    Extension,
    Heuristic,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub media_kind: MediaKind,
    pub category: ResourceCategory,
    pub mime_type: String,
    pub extension: String,
    /// Defer category detection to the storage service
    pub auto_detect: bool,
    pub source: ClassificationSource,
}

/// MIME type for a file extension (case-insensitive).
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.to_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(e, _, _)| *e == ext)
        .map(|(_, mime, _)| *mime)
}

fn kind_for_extension(extension: &str) -> Option<MediaKind> {
    EXTENSION_TABLE
        .iter()
        .find(|(e, _, _)| *e == extension)
        .map(|(_, _, kind)| *kind)
}

/// Preferred extension for a MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let mime = normalize_mime(mime);
    EXTENSION_TABLE
        .iter()
        .find(|(_, m, _)| *m == mime)
        .map(|(e, _, _)| *e)
        .or_else(|| {
            MIME_ALIASES
                .iter()
                .find(|(m, _)| *m == mime)
                .map(|(_, e)| *e)
        })
}

/// Media kind and category from a MIME type prefix.
pub fn category_for_mime(mime: &str) -> Option<(MediaKind, ResourceCategory)> {
    let mime = normalize_mime(mime);
    let kind = if mime.starts_with("audio/") {
        MediaKind::Audio
    } else if mime.starts_with("video/") {
        MediaKind::Video
    } else if mime.starts_with("image/") {
        MediaKind::Image
    } else if mime.starts_with("application/") || mime.starts_with("text/") {
        MediaKind::Document
    } else {
        return None;
    };
    Some((kind, kind.resource_category()))
}

/// Lowercase and drop parameters (`; charset=...`).
fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn is_mime_token(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
}

/// Declared content type in a form the storage service accepts.
///
/// Returns the normalized `type/subtype` when it is well formed and its prefix
/// maps to a category, otherwise `None`.
pub fn usable_content_type(mime: &str) -> Option<String> {
    let mime = normalize_mime(mime);
    let (top, sub) = mime.split_once('/')?;
    if !is_mime_token(top) || !is_mime_token(sub) {
        return None;
    }
    category_for_mime(&mime)?;
    Some(mime)
}

/// Extension of the last path segment of a URI, ignoring query and fragment.
pub fn uri_extension(uri: &str) -> Option<String> {
    if uri.starts_with("data:") {
        return None;
    }
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}

fn is_ambiguous(extension: &str) -> bool {
    AMBIGUOUS_EXTENSIONS.contains(&extension)
}

fn default_extension_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => FALLBACK_EXTENSION,
        MediaKind::Video => "mp4",
        MediaKind::Audio => "mp3",
        MediaKind::Document => "bin",
    }
}

fn from_mime(file: &FileRef, mime: &str, source: ClassificationSource) -> Option<Classification> {
    let mime_type = usable_content_type(mime)?;
    let (media_kind, category) = category_for_mime(&mime_type)?;
    let extension = extension_for_mime(&mime_type)
        .map(String::from)
        .or_else(|| uri_extension(file.uri()))
        .unwrap_or_else(|| default_extension_for(media_kind).to_string());
    Some(Classification {
        media_kind,
        category,
        auto_detect: is_ambiguous(&extension),
        mime_type,
        extension,
        source,
    })
}

fn from_extension(file: &FileRef) -> Option<Classification> {
    let extension = uri_extension(file.uri())?;
    let media_kind = kind_for_extension(&extension)?;
    let mime_type = mime_for_extension(&extension)?.to_string();
    Some(Classification {
        media_kind,
        category: media_kind.resource_category(),
        auto_detect: is_ambiguous(&extension),
        mime_type,
        extension,
        source: ClassificationSource::Extension,
    })
}

fn from_heuristic(file: &FileRef) -> Option<Classification> {
    let uri = file.uri().to_lowercase();
    let (media_kind, mime_type) = if uri.contains("audio") {
        (MediaKind::Audio, "audio/mpeg")
    } else if uri.contains("video") {
        (MediaKind::Video, "video/mp4")
    } else if uri.contains("image") {
        (MediaKind::Image, FALLBACK_MIME_TYPE)
    } else if DOCUMENT_MARKERS.iter().any(|m| uri.contains(m)) {
        (MediaKind::Document, "application/octet-stream")
    } else {
        return None;
    };
    Some(Classification {
        media_kind,
        category: media_kind.resource_category(),
        mime_type: mime_type.to_string(),
        extension: default_extension_for(media_kind).to_string(),
        auto_detect: false,
        source: ClassificationSource::Heuristic,
    })
}

/// Classify a file.
///
/// Priority: byte-level inspection result (`sniffed_type`), the file's MIME
/// hint, the extension table, a substring heuristic on the URI, and finally
/// image/JPEG.
pub fn classify(file: &FileRef, sniffed_type: Option<&str>) -> Classification {
    sniffed_type
        .and_then(|mime| from_mime(file, mime, ClassificationSource::Inspected))
        .or_else(|| {
            file.mime_hint()
                .and_then(|mime| from_mime(file, mime, ClassificationSource::MimeHint))
        })
        .or_else(|| from_extension(file))
        .or_else(|| from_heuristic(file))
        .unwrap_or_else(|| Classification {
            media_kind: MediaKind::Image,
            category: ResourceCategory::Image,
            mime_type: FALLBACK_MIME_TYPE.to_string(),
            extension: FALLBACK_EXTENSION.to_string(),
            auto_detect: false,
            source: ClassificationSource::Fallback,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_uri(uri: &str) -> Classification {
        classify(&FileRef::new(uri), None)
    }

    #[test]
    fn every_table_extension_classifies_deterministically() {
        let cases: &[(&str, ResourceCategory, MediaKind)] = &[
            ("jpg", ResourceCategory::Image, MediaKind::Image),
            ("jpeg", ResourceCategory::Image, MediaKind::Image),
            ("png", ResourceCategory::Image, MediaKind::Image),
            ("gif", ResourceCategory::Image, MediaKind::Image),
            ("webp", ResourceCategory::Image, MediaKind::Image),
            ("bmp", ResourceCategory::Image, MediaKind::Image),
            ("svg", ResourceCategory::Image, MediaKind::Image),
            ("tiff", ResourceCategory::Image, MediaKind::Image),
            ("ico", ResourceCategory::Image, MediaKind::Image),
            ("heic", ResourceCategory::Image, MediaKind::Image),
            ("mp4", ResourceCategory::Video, MediaKind::Video),
            ("mov", ResourceCategory::Video, MediaKind::Video),
            ("avi", ResourceCategory::Video, MediaKind::Video),
            ("webm", ResourceCategory::Video, MediaKind::Video),
            ("flv", ResourceCategory::Video, MediaKind::Video),
            ("wmv", ResourceCategory::Video, MediaKind::Video),
            ("3gp", ResourceCategory::Video, MediaKind::Video),
            ("mkv", ResourceCategory::Video, MediaKind::Video),
            ("m4v", ResourceCategory::Video, MediaKind::Video),
            ("mp3", ResourceCategory::Video, MediaKind::Audio),
            ("wav", ResourceCategory::Video, MediaKind::Audio),
            ("aac", ResourceCategory::Video, MediaKind::Audio),
            ("ogg", ResourceCategory::Video, MediaKind::Audio),
            ("flac", ResourceCategory::Video, MediaKind::Audio),
            ("m4a", ResourceCategory::Video, MediaKind::Audio),
            ("wma", ResourceCategory::Video, MediaKind::Audio),
            ("opus", ResourceCategory::Video, MediaKind::Audio),
            ("amr", ResourceCategory::Video, MediaKind::Audio),
            ("pdf", ResourceCategory::Raw, MediaKind::Document),
            ("doc", ResourceCategory::Raw, MediaKind::Document),
            ("docx", ResourceCategory::Raw, MediaKind::Document),
            ("txt", ResourceCategory::Raw, MediaKind::Document),
            ("rtf", ResourceCategory::Raw, MediaKind::Document),
            ("xls", ResourceCategory::Raw, MediaKind::Document),
            ("xlsx", ResourceCategory::Raw, MediaKind::Document),
            ("ppt", ResourceCategory::Raw, MediaKind::Document),
            ("pptx", ResourceCategory::Raw, MediaKind::Document),
            ("csv", ResourceCategory::Raw, MediaKind::Document),
        ];
        assert_eq!(cases.len(), EXTENSION_TABLE.len());

        for (ext, category, kind) in cases {
            let uri = format!("file:///data/user/0/cache/capture.{}", ext);
            let first = classify_uri(&uri);
            let second = classify_uri(&uri);
            assert_eq!(first, second, "non-deterministic for {}", ext);
            assert_eq!(first.category, *category, "category for {}", ext);
            assert_eq!(first.media_kind, *kind, "kind for {}", ext);
            assert_eq!(first.extension, *ext);
            assert_eq!(first.source, ClassificationSource::Extension);
            assert_eq!(Some(first.mime_type.as_str()), mime_for_extension(ext));
        }
    }

    #[test]
    fn extension_match_is_case_insensitive_and_ignores_query() {
        let c = classify_uri("https://cdn.example.com/clips/Evidence.MP4?token=abc#t=3");
        assert_eq!(c.category, ResourceCategory::Video);
        assert_eq!(c.extension, "mp4");
    }

    #[test]
    fn ambiguous_containers_defer_to_auto_detection() {
        assert!(classify_uri("file:///sdcard/rec.3gp").auto_detect);
        assert!(classify_uri("file:///sdcard/rec.ogg").auto_detect);
        assert!(!classify_uri("file:///sdcard/rec.mp4").auto_detect);
        assert!(!classify_uri("file:///sdcard/rec.m4a").auto_detect);
    }

    #[test]
    fn inspected_type_wins_over_extension() {
        let file = FileRef::new("blob:https://app.example.com/7d1e.jpg");
        let c = classify(&file, Some("audio/x-m4a"));
        assert_eq!(c.media_kind, MediaKind::Audio);
        assert_eq!(c.category, ResourceCategory::Video);
        assert_eq!(c.extension, "m4a");
        assert_eq!(c.source, ClassificationSource::Inspected);
    }

    #[test]
    fn inspected_type_with_parameters_is_normalized() {
        let c = classify(&FileRef::new("blob:x"), Some("Text/Plain; charset=UTF-8"));
        assert_eq!(c.category, ResourceCategory::Raw);
        assert_eq!(c.mime_type, "text/plain");
        assert_eq!(c.extension, "txt");
    }

    #[test]
    fn unusable_inspected_type_falls_through() {
        let c = classify(&FileRef::new("file:///x/report.pdf"), Some("unknown"));
        assert_eq!(c.category, ResourceCategory::Raw);
        assert_eq!(c.source, ClassificationSource::Extension);
    }

    #[test]
    fn mime_hint_used_before_extension() {
        let file =
            FileRef::new("content://media/external/file/99").with_mime_hint("video/quicktime");
        let c = classify(&file, None);
        assert_eq!(c.media_kind, MediaKind::Video);
        assert_eq!(c.extension, "mov");
        assert_eq!(c.source, ClassificationSource::MimeHint);
    }

    #[test]
    fn heuristic_tokens_in_uri() {
        let c = classify_uri("content://media/external/audio/media/42");
        assert_eq!(c.media_kind, MediaKind::Audio);
        assert_eq!(c.category, ResourceCategory::Video);
        assert_eq!(c.source, ClassificationSource::Heuristic);

        let c = classify_uri("content://media/external/video/media/42");
        assert_eq!(c.media_kind, MediaKind::Video);

        let c = classify_uri("content://com.android.providers.downloads.documents/document/7");
        assert_eq!(c.category, ResourceCategory::Raw);
    }

    #[test]
    fn unknown_defaults_to_jpeg() {
        let c = classify_uri("ph://3F2504E0-4F89-11D3");
        assert_eq!(c.category, ResourceCategory::Image);
        assert_eq!(c.mime_type, "image/jpeg");
        assert_eq!(c.extension, "jpg");
        assert_eq!(c.source, ClassificationSource::Fallback);
    }

    #[test]
    fn extension_for_mime_handles_aliases() {
        assert_eq!(extension_for_mime("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_mime("image/jpg"), Some("jpg"));
        assert_eq!(extension_for_mime("audio/x-wav"), Some("wav"));
        assert_eq!(extension_for_mime("application/x-unknown"), None);
    }

    #[test]
    fn uri_extension_edge_cases() {
        assert_eq!(uri_extension("file:///a/b/c"), None);
        assert_eq!(uri_extension("file:///a.dir/c"), None);
        assert_eq!(uri_extension("data:image/png;base64,AAAA"), None);
        assert_eq!(uri_extension("/tmp/photo.JPG"), Some("jpg".to_string()));
    }

    #[test]
    fn malformed_content_types_are_unusable() {
        assert_eq!(
            usable_content_type("Image/PNG; charset=binary").as_deref(),
            Some("image/png")
        );
        assert_eq!(usable_content_type("jpeg"), None);
        assert_eq!(usable_content_type("image/"), None);
        assert_eq!(usable_content_type("image/j peg"), None);
        assert_eq!(usable_content_type("font/woff2"), None);
    }
}
