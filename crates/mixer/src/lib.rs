//! Orchestration of a whole mixing run.
//!
//! The primary entry point is [`mix`], which streams [`MixEvent`]s while it
//! retrieves every origin, validates and plans both pipelines, and produces
//! the tracks into a freshly versioned output directory.

pub mod error;
mod event;
mod produce;
mod stream;

pub use self::event::{MixEvent, MixSummary, Plan, SourceSummary};
pub use self::stream::mix;
use rotamix_core::Origin;
use rotamix_media::{DownloadCache, EncoderHandle, NormalizationSpec, RetrieverHandle, TagWriterHandle};
use std::path::PathBuf;

/// What to mix, and how.
#[derive(Debug, Clone)]
pub struct MixRequest {
    /// Origins in argument order.
    pub origins: Vec<Origin>,
    /// Album name as given; sanitized for the directory, verbatim in tags.
    pub album: String,
    /// Parent of the versioned album directory.
    pub output_dir: PathBuf,
    pub video: bool,
    /// Plan and compose metadata only; nothing is downloaded or written.
    pub dry_run: bool,
    pub recursive: bool,
    pub normalization: NormalizationSpec,
    pub retrieve_concurrency: usize,
    pub encode_concurrency: usize,
}
impl MixRequest {
    pub fn new(
        origins: impl IntoIterator<Item = Origin>,
        album: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            origins: origins.into_iter().collect(),
            album: album.into(),
            output_dir: output_dir.into(),
            video: false,
            dry_run: false,
            recursive: false,
            normalization: NormalizationSpec::default(),
            retrieve_concurrency: 4,
            encode_concurrency: 1,
        }
    }
}

/// The external services a run drives.
#[derive(Clone)]
pub struct Collaborators {
    pub retriever: RetrieverHandle,
    pub encoder: EncoderHandle,
    pub tags: TagWriterHandle,
    /// Swept of expired entries at the start of every run.
    pub cache: Option<DownloadCache>,
}
