//! Audio/video pipeline selection.
//!
//! The two pipelines are planned independently: a source can take part in one
//! and not the other, and their track counts can differ.

use crate::source::{MediaItem, MediaRef, Source};
use derive_more::Display;

/// One of the two independent processing tracks.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    #[display("audio")]
    Audio,
    #[display("video")]
    Video,
}
impl Pipeline {
    /// File extension of the tracks this pipeline produces.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Audio => "mp3",
            Self::Video => "mp4",
        }
    }

    /// The reference this pipeline consumes from `item`, if it has one.
    pub fn media_ref<'a>(&self, item: &'a MediaItem) -> Option<&'a MediaRef> {
        match self {
            Self::Audio => item.audio_ref(),
            Self::Video => item.video_ref(),
        }
    }

    pub fn accepts(&self, item: &MediaItem) -> bool {
        self.media_ref(item).is_some()
    }

    /// Whether at least one item of `source` can feed this pipeline.
    pub fn is_eligible(&self, source: &Source) -> bool {
        source.items().iter().any(|item| self.accepts(item))
    }
}

/// The per-pipeline source lists produced by [`select`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    pub audio: Vec<Source>,
    pub video: Vec<Source>,
}
impl Selection {
    pub fn sources(&self, pipeline: Pipeline) -> &[Source] {
        match pipeline {
            Pipeline::Audio => &self.audio,
            Pipeline::Video => &self.video,
        }
    }
}

/// Derives the audio-eligible and video-eligible source lists.
///
/// Eligible sources keep *all* of their items, including ones the pipeline
/// cannot use; those simply contribute nothing on their rotation step. The
/// video list stays empty unless `video_requested`.
pub fn select(sources: &[Source], video_requested: bool) -> Selection {
    let eligible =
        |pipeline: Pipeline| sources.iter().filter(|s| pipeline.is_eligible(s)).cloned().collect::<Vec<_>>();
    let selection = Selection {
        audio: eligible(Pipeline::Audio),
        video: match video_requested {
            true => eligible(Pipeline::Video),
            false => Vec::new(),
        },
    };
    tracing::debug!(
        audio = selection.audio.len(),
        video = selection.video.len(),
        video_requested,
        "Selected pipeline sources"
    );
    selection
}
