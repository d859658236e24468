//! Storage HTTP transport
//!
//! [`StorageTransport`] is the seam between the orchestrator and the network.
//! [`HttpTransport`] is the reqwest implementation; tests substitute fakes.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use vigil_core::{PipelineError, PipelineResult};

use crate::payload::{FilePart, FileSource, MultipartPayload};

/// Status and raw body of a storage service response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait StorageTransport: Send + Sync {
    /// POST a multipart body. Non-2xx responses are returned, not turned into errors.
    async fn post_multipart(
        &self,
        url: &str,
        payload: MultipartPayload,
    ) -> PipelineResult<TransportResponse>;
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponseBody {
    secure_url: Option<String>,
    url: Option<String>,
}

/// `error.message` from a service error body, when parseable.
pub fn service_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
        .filter(|m| !m.trim().is_empty())
}

/// Turn a non-2xx response into `ServiceRejected`.
pub fn rejection(response: &TransportResponse) -> PipelineError {
    let message = service_error_message(&response.body)
        .unwrap_or_else(|| format!("Request failed with status {}", response.status));
    PipelineError::ServiceRejected {
        status: response.status,
        message,
    }
}

/// Delivery URL from an upload response (`secure_url`, else `url`).
pub fn parse_upload_response(response: &TransportResponse) -> PipelineResult<String> {
    if !response.is_success() {
        return Err(rejection(response));
    }

    let body: UploadResponseBody = serde_json::from_str(&response.body).map_err(|e| {
        PipelineError::ServiceRejected {
            status: response.status,
            message: format!("Unreadable upload response: {}", e),
        }
    })?;

    body.secure_url
        .or(body.url)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| PipelineError::ServiceRejected {
            status: response.status,
            message: "Upload response did not include a URL".to_string(),
        })
}

/// reqwest-backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Client without a global timeout; the orchestrator times each attempt.
    pub fn new() -> PipelineResult<Self> {
        let client = Client::builder().build().map_err(|e| {
            PipelineError::TransportFailure(format!("Failed to create HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn file_to_part(file: FilePart) -> PipelineResult<Part> {
        let mut part = match file.source {
            FileSource::Bytes(bytes) => Part::bytes(bytes.to_vec()),
            FileSource::Path(path) => {
                let handle = tokio::fs::File::open(&path).await.map_err(|e| {
                    PipelineError::PayloadConstructionFailed(format!(
                        "Failed to open {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let length = handle.metadata().await.map(|m| m.len()).ok();
                let body = Body::wrap_stream(ReaderStream::new(handle));
                match length {
                    Some(len) => Part::stream_with_length(body, len),
                    None => Part::stream(body),
                }
            }
        };

        if let Some(name) = file.file_name {
            part = part.file_name(name);
        }
        if let Some(mime) = file.mime_type {
            part = part.mime_str(&mime).map_err(|e| {
                PipelineError::PayloadConstructionFailed(format!(
                    "Invalid MIME type {}: {}",
                    mime, e
                ))
            })?;
        }
        Ok(part)
    }

    async fn into_form(payload: MultipartPayload) -> PipelineResult<Form> {
        let mut form = Form::new();
        for (name, value) in payload.fields {
            form = form.text(name, value);
        }
        if let Some(file) = payload.file {
            form = form.part("file", Self::file_to_part(file).await?);
        }
        Ok(form)
    }
}

#[async_trait]
impl StorageTransport for HttpTransport {
    async fn post_multipart(
        &self,
        url: &str,
        payload: MultipartPayload,
    ) -> PipelineResult<TransportResponse> {
        let form = Self::into_form(payload).await?;

        // The multipart Content-Type (with boundary) is set by reqwest; never set it here
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::TransportFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| {
                PipelineError::TransportFailure(format!("Failed to read response: {}", e))
            })?;

        Ok(TransportResponse { status, body })
    }
}
