use crate::metadata::{self, TrackMetadata};
use crate::pipeline::Pipeline;
use crate::source::{MediaItem, MediaRef};
use std::path::{Path, PathBuf};

/// One planned output track of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pipeline: Pipeline,
    index: usize,
    contributors: Vec<MediaItem>,
    metadata: Option<TrackMetadata>,
    output: Option<PathBuf>,
}
impl Track {
    /// Creates track `index` (1-based) of `total` from its contributors, in
    /// source order. Audio tracks compose their metadata here.
    pub fn new(pipeline: Pipeline, index: usize, total: usize, contributors: Vec<MediaItem>) -> Self {
        let metadata = match pipeline {
            Pipeline::Audio => Some(metadata::compose(&contributors, index, total)),
            Pipeline::Video => None,
        };
        Self { pipeline, index, contributors, metadata, output: None }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// Every item assigned to this track, including ones this pipeline
    /// cannot use.
    pub fn contributors(&self) -> &[MediaItem] {
        &self.contributors
    }

    /// The references this track's pipeline actually consumes, in source order.
    pub fn inputs(&self) -> Vec<&MediaRef> {
        self.contributors.iter().filter_map(|item| self.pipeline.media_ref(item)).collect()
    }

    /// `false` when no contributor has this pipeline's capability; such a
    /// track is skipped rather than encoded.
    pub fn has_inputs(&self) -> bool {
        self.contributors.iter().any(|item| self.pipeline.accepts(item))
    }

    pub fn metadata(&self) -> Option<&TrackMetadata> {
        self.metadata.as_ref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Assigns the final output path. The first assignment wins; later calls
    /// return `false` and leave the path untouched.
    pub fn assign_output(&mut self, path: impl Into<PathBuf>) -> bool {
        if self.output.is_some() {
            return false;
        }
        self.output = Some(path.into());
        true
    }
}
