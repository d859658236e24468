//! Vigil Storage Library
//!
//! Resilient upload and deletion of evidence media against a Cloudinary-style
//! storage service.
//!
//! # Upload tiers
//!
//! Each upload runs an ordered list of strategies and stops at the first success:
//!
//! - **Primary**: general payload, sent to `.../<category>/upload`
//! - **Platform specialized**: conservative payload with explicit `resource_type`,
//!   only on platforms with strict multipart parsing
//! - **Simple fallback**: bare payload, images only
//!
//! Video uploads can additionally be wrapped in a full-pipeline retry loop with
//! exponential backoff ([`UploadOrchestrator::upload_video`]).
//!
//! # Deletion
//!
//! The delivery URL returned by an upload is the only thing callers need to keep.
//! [`DeletionClient`] parses it back into a public id and sends a signed destroy.

pub mod batch;
pub mod classifier;
pub mod deletion;
pub mod factory;
pub mod orchestrator;
pub mod payload;
pub mod pipeline;
pub mod platform;
pub mod retry;
pub mod signer;
pub mod transport;

// Re-export commonly used types
pub use batch::BatchCoordinator;
pub use classifier::{classify, Classification, ClassificationSource};
pub use deletion::DeletionClient;
pub use factory::{create_pipeline, create_pipeline_with_transport};
pub use orchestrator::{plan_tiers, Tier, UploadOrchestrator};
pub use payload::{generate_file_name, MultipartPayload, PayloadEncoder, PayloadShape};
pub use pipeline::MediaPipeline;
pub use platform::{
    BrowserPlatform, NativeHandlePlatform, PlatformCapability, PlatformKind, PlatformProfile,
    PlatformTraits,
};
pub use retry::backoff_delay;
pub use signer::{parse_delivery_url, sign_params, DeletionRequest, ParsedAsset};
pub use transport::{HttpTransport, StorageTransport, TransportResponse};
