pub mod media;
pub mod outcome;

pub use media::{FileRef, MediaKind, ResourceCategory, UploadTarget};
pub use outcome::{BatchOutcome, UploadOutcome};
