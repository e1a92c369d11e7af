//! Job and result message types.
//!
//! These are the payloads moved across the worker boundary: a [`Job`] is
//! handed to exactly one worker, and exactly one [`JobResult`] comes back
//! for it, matched by id. Both are self-contained - no references into
//! coordinator state.

use pixelmill_core::{CompressOptions, CompressedImage, Dimensions};
use serde::{Deserialize, Serialize};

/// One image to transcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique id, used to match the result back to this job.
    pub id: String,
    /// Raw image bytes, moved into the worker.
    pub bytes: Vec<u8>,
    /// Source filename, carried through for reporting.
    pub filename: String,
    /// Compression settings for this job.
    pub options: CompressOptions,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        bytes: Vec<u8>,
        filename: impl Into<String>,
        options: CompressOptions,
    ) -> Self {
        Self {
            id: id.into(),
            bytes,
            filename: filename.into(),
            options,
        }
    }
}

/// Outcome of one job.
///
/// `compressed_bytes` is present exactly when `success` is true, and
/// `error` exactly when it is false; the constructors uphold this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub id: String,
    pub filename: String,
    pub success: bool,
    pub original_size: u64,
    pub compressed_size: u64,
    pub original_dimensions: Dimensions,
    pub compressed_dimensions: Dimensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_bytes: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    /// Build a success result from the executor's output.
    pub fn from_success(id: String, filename: String, image: CompressedImage) -> Self {
        Self {
            id,
            filename,
            success: true,
            original_size: image.original_size,
            compressed_size: image.compressed_size(),
            original_dimensions: image.original_dimensions,
            compressed_dimensions: image.compressed_dimensions,
            compressed_bytes: Some(image.bytes),
            error: None,
        }
    }

    /// Build a failure result carrying a descriptive error message.
    pub fn from_failure(id: String, filename: String, original_size: u64, error: String) -> Self {
        Self {
            id,
            filename,
            success: false,
            original_size,
            compressed_size: 0,
            original_dimensions: Dimensions::default(),
            compressed_dimensions: Dimensions::default(),
            compressed_bytes: None,
            error: Some(error),
        }
    }
}
