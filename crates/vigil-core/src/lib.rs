//! Vigil Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration
//! shared by the evidence upload pipeline and its front ends.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{RetryPolicy, StorageConfig, TimeoutPolicy};
pub use error::{ErrorKind, ErrorMetadata, LogLevel, PipelineError, PipelineResult};
pub use models::{
    BatchOutcome, FileRef, MediaKind, ResourceCategory, UploadOutcome, UploadTarget,
};
