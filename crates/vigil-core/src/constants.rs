//! Shared constants

/// Default base URL of the storage service's upload/admin API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Folder used for report evidence uploads.
pub const REPORT_EVIDENCE_FOLDER: &str = "report_evidence";

/// Folder used by the profile picture convenience wrapper.
pub const PROFILE_PICTURE_FOLDER: &str = "profile_pictures";

/// Literal path segment that follows the resource category in delivery URLs.
pub const UPLOAD_SEGMENT: &str = "upload";

/// Value of the `result` field the storage service returns for a successful destroy.
pub const DESTROY_OK: &str = "ok";

/// Length of a hex-encoded SHA-1 digest.
pub const SIGNATURE_HEX_LEN: usize = 40;

/// MIME type assumed when nothing else identifies a file (photo capture).
pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Extension matching [`FALLBACK_MIME_TYPE`].
pub const FALLBACK_EXTENSION: &str = "jpg";
