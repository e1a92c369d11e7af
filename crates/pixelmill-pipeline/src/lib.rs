//! Pixelmill Pipeline - parallel image transcoding
//!
//! This crate owns the concurrent half of Pixelmill: self-contained job and
//! result messages, a fixed pool of isolated worker threads, and the
//! work-conserving dispatch queue that feeds them. The per-image algorithms
//! live in `pixelmill-core`; workers and the coordinator share no mutable
//! state and communicate only by moving message payloads over channels.

pub mod dispatch;
pub mod job;
pub mod registry;

mod worker;

pub use dispatch::{BatchState, DispatchQueue};
pub use job::{Job, JobResult};
pub use registry::{ResultRegistry, ResultView};

// Re-export the per-image surface so callers can build jobs without
// depending on the core crate directly.
pub use pixelmill_core::{compress, CompressOptions, Dimensions, Orientation, OutputFormat};
