//! Deletion signing
//!
//! Delivery URLs are the only durable record of an upload, so everything a
//! deletion needs is recovered from the URL itself:
//!
//! ```text
//! https://<host>/<cloud>/<category>/upload/[v<version>/]<folders>/<name>.<ext>
//!                        ^^^^^^^^^^                      ^^^^^^^^^^^^^^^^
//!                        resource category               public id
//! ```
//!
//! Requests are signed with SHA-1 over the sorted `key=value` parameters
//! followed directly by the API secret.

use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use vigil_core::constants::{SIGNATURE_HEX_LEN, UPLOAD_SEGMENT};
use vigil_core::{PipelineError, PipelineResult, ResourceCategory};

use crate::payload::MultipartPayload;

/// Parameters sent with a request but never signed.
const UNSIGNED_PARAMS: &[&str] = &["api_key", "file", "resource_type", "cloud_name", "signature"];

/// Identity of a stored asset, recovered from its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAsset {
    pub public_id: String,
    pub resource_category: ResourceCategory,
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Parse a delivery URL produced by an upload.
pub fn parse_delivery_url(url: &str, cloud_name: &str) -> PipelineResult<ParsedAsset> {
    let unparseable = |reason: &str| PipelineError::UrlUnparseable(format!("{} ({})", url, reason));

    let parsed = reqwest::Url::parse(url).map_err(|_| unparseable("not a URL"))?;
    let segments: Vec<String> = parsed
        .path_segments()
        .ok_or_else(|| unparseable("no path"))?
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect();

    let cloud_pos = segments
        .iter()
        .position(|s| s == cloud_name)
        .ok_or_else(|| unparseable("cloud name not found"))?;

    let category = segments
        .get(cloud_pos + 1)
        .ok_or_else(|| unparseable("missing resource category"))?
        .parse::<ResourceCategory>()
        .map_err(|_| unparseable("unknown resource category"))?;

    if segments.get(cloud_pos + 2).map(String::as_str) != Some(UPLOAD_SEGMENT) {
        return Err(unparseable("expected 'upload' segment"));
    }

    let mut rest: Vec<&str> = segments[cloud_pos + 3..]
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if rest.len() > 1 && is_version_segment(rest[0]) {
        rest.remove(0);
    }
    if rest.is_empty() {
        return Err(unparseable("missing public id"));
    }

    let joined = rest.join("/");
    let public_id = match joined.rfind('.') {
        Some(dot) if dot > joined.rfind('/').map_or(0, |slash| slash + 1) => &joined[..dot],
        _ => joined.as_str(),
    };

    Ok(ParsedAsset {
        public_id: public_id.to_string(),
        resource_category: category,
    })
}

/// Canonical string: signable params sorted by key, `key=value` joined by `&`.
pub fn string_to_sign(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, v)| !UNSIGNED_PARAMS.contains(&k.as_str()) && !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn is_valid_signature(signature: &str) -> bool {
    signature.len() == SIGNATURE_HEX_LEN && signature.chars().all(|c| c.is_ascii_hexdigit())
}

/// SHA-1 hex signature of the canonical string with the secret appended.
pub fn sign_params(params: &BTreeMap<String, String>, api_secret: &str) -> PipelineResult<String> {
    let digest = Sha1::digest(format!("{}{}", string_to_sign(params), api_secret).as_bytes());

    let signature = hex::encode(digest);
    if is_valid_signature(&signature) {
        return Ok(signature);
    }

    // Re-encode the same digest by hand before giving up
    let signature: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    if is_valid_signature(&signature) {
        tracing::warn!("Signature re-encoded after invalid hex encoding");
        return Ok(signature);
    }

    Err(PipelineError::SignatureInvariantViolation(format!(
        "digest encoded to {} characters",
        signature.len()
    )))
}

/// One signed destroy request. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRequest {
    pub public_id: String,
    pub resource_category: ResourceCategory,
    pub timestamp: i64,
    pub api_key: String,
    pub signature: String,
}

impl DeletionRequest {
    pub fn new(
        asset: ParsedAsset,
        timestamp: i64,
        api_key: &str,
        api_secret: &str,
    ) -> PipelineResult<Self> {
        let mut params = BTreeMap::new();
        params.insert("public_id".to_string(), asset.public_id.clone());
        params.insert("timestamp".to_string(), timestamp.to_string());
        let signature = sign_params(&params, api_secret)?;

        Ok(Self {
            public_id: asset.public_id,
            resource_category: asset.resource_category,
            timestamp,
            api_key: api_key.to_string(),
            signature,
        })
    }

    pub fn into_payload(self) -> MultipartPayload {
        MultipartPayload::default()
            .text("public_id", self.public_id)
            .text("timestamp", self.timestamp.to_string())
            .text("api_key", self.api_key)
            .text("signature", self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(public_id: &str, timestamp: &str) -> BTreeMap<String, String> {
        let mut p = BTreeMap::new();
        p.insert("public_id".to_string(), public_id.to_string());
        p.insert("timestamp".to_string(), timestamp.to_string());
        p
    }

    #[test]
    fn parses_versioned_url_with_folders() {
        let asset = parse_delivery_url(
            "https://res.cloudinary.com/demo/video/upload/v123/folder/name.mp4",
            "demo",
        )
        .unwrap();
        assert_eq!(asset.public_id, "folder/name");
        assert_eq!(asset.resource_category, ResourceCategory::Video);
    }

    #[test]
    fn parses_url_without_version() {
        let asset = parse_delivery_url(
            "https://res.cloudinary.com/demo/image/upload/folder/name.jpg",
            "demo",
        )
        .unwrap();
        assert_eq!(asset.public_id, "folder/name");
        assert_eq!(asset.resource_category, ResourceCategory::Image);
    }

    #[test]
    fn strips_only_last_extension() {
        let asset = parse_delivery_url(
            "https://res.cloudinary.com/demo/raw/upload/v1/report.final.pdf",
            "demo",
        )
        .unwrap();
        assert_eq!(asset.public_id, "report.final");
        assert_eq!(asset.resource_category, ResourceCategory::Raw);
    }

    #[test]
    fn dot_in_folder_is_not_an_extension() {
        let asset = parse_delivery_url(
            "https://res.cloudinary.com/demo/image/upload/v9/my.folder/name",
            "demo",
        )
        .unwrap();
        assert_eq!(asset.public_id, "my.folder/name");
    }

    #[test]
    fn version_only_segment_is_a_public_id() {
        let url = "https://res.cloudinary.com/demo/image/upload/v12.jpg";
        let asset = parse_delivery_url(url, "demo").unwrap();
        assert_eq!(asset.public_id, "v12");
    }

    #[test]
    fn rejects_foreign_urls() {
        for url in [
            "https://res.cloudinary.com/other/image/upload/v1/a.jpg",
            "https://res.cloudinary.com/demo/image/fetch/v1/a.jpg",
            "https://res.cloudinary.com/demo/audio/upload/v1/a.mp3",
            "https://res.cloudinary.com/demo/image/upload/",
            "not a url",
        ] {
            assert!(
                matches!(parse_delivery_url(url, "demo"), Err(PipelineError::UrlUnparseable(_))),
                "{} should not parse",
                url
            );
        }
    }

    #[test]
    fn canonical_string_is_sorted_and_filtered() {
        let mut p = params("evidence/a", "1700000000");
        p.insert("api_key".to_string(), "123".to_string());
        p.insert("resource_type".to_string(), "video".to_string());
        p.insert("invalidate".to_string(), "true".to_string());
        assert_eq!(
            string_to_sign(&p),
            "invalidate=true&public_id=evidence/a&timestamp=1700000000"
        );
    }

    #[test]
    fn known_signature_vector() {
        // sha1("public_id=sample&timestamp=1315060510abcd")
        let signature = sign_params(&params("sample", "1315060510"), "abcd").unwrap();
        assert_eq!(signature, "c3470533147774275dd37996cc4d0e68fd03cd4f");
    }

    #[test]
    fn signature_is_deterministic_and_sensitive() {
        let a = sign_params(&params("folder/name", "1700000000"), "secret").unwrap();
        let b = sign_params(&params("folder/name", "1700000000"), "secret").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let variants = [
            sign_params(&params("folder/namf", "1700000000"), "secret").unwrap(),
            sign_params(&params("folder/name", "1700000001"), "secret").unwrap(),
            sign_params(&params("folder/name", "1700000000"), "secreu").unwrap(),
        ];
        for v in &variants {
            assert_ne!(&a, v);
        }
    }

    #[test]
    fn deletion_request_payload_fields() {
        let asset = ParsedAsset {
            public_id: "report_evidence/report_evidence_1".to_string(),
            resource_category: ResourceCategory::Video,
        };
        let request = DeletionRequest::new(asset, 1_700_000_000, "key", "secret").unwrap();
        let expected = sign_params(
            &params("report_evidence/report_evidence_1", "1700000000"),
            "secret",
        )
        .unwrap();
        assert_eq!(request.signature, expected);

        let payload = request.into_payload();
        assert_eq!(payload.field("api_key"), Some("key"));
        assert_eq!(payload.field("timestamp"), Some("1700000000"));
        assert_eq!(payload.field("signature"), Some(expected.as_str()));
        assert!(payload.file.is_none());
    }
}
