use rotamix_core::{DropReason, Origin, Pipeline, Source};
use std::path::PathBuf;

/// What retrieval produced for one surviving source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    /// 1-based position on the command line.
    pub index: usize,
    pub origin: Origin,
    pub audio: usize,
    pub video: usize,
    pub skipped: usize,
    pub cached: usize,
}
impl From<&Source> for SourceSummary {
    fn from(source: &Source) -> Self {
        Self {
            index: source.index(),
            origin: source.origin().clone(),
            audio: source.audio_count(),
            video: source.video_count(),
            skipped: source.skipped,
            cached: source.cached,
        }
    }
}

/// Track counts of both pipelines, known once planning is done.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub audio_sources: usize,
    pub audio_tracks: usize,
    pub video_sources: usize,
    pub video_tracks: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MixSummary {
    pub plan: Plan,
    pub audio_created: usize,
    pub video_created: usize,
    /// `None` for planning-only runs.
    pub output_dir: Option<PathBuf>,
    /// Intermediate artifacts removed at the end of the run.
    pub cleaned: usize,
}

/// Progress events emitted by [`mix`](crate::mix).
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) and [`CacheSwept`](Self::CacheSwept).
/// 2. One [`SourceResolved`](Self::SourceResolved) or
///    [`SourceDropped`](Self::SourceDropped) per origin, in argument order.
/// 3. [`Planned`](Self::Planned), exactly once.
/// 4. Planning-only runs: one [`TrackPreview`](Self::TrackPreview) per track.
///    Otherwise [`OutputResolved`](Self::OutputResolved) followed by one
///    [`TrackCreated`](Self::TrackCreated), [`TrackSkipped`](Self::TrackSkipped)
///    or `Err` item per track, in completion order.
/// 5. [`Complete`](Self::Complete), exactly once.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixEvent {
    Started { origins: usize, dry_run: bool },
    /// Expired download cache entries removed before retrieval.
    CacheSwept(usize),
    SourceResolved(SourceSummary),
    SourceDropped { index: usize, origin: Origin, reason: DropReason },
    Planned(Plan),
    OutputResolved(PathBuf),
    TrackPreview { pipeline: Pipeline, index: usize, total: usize, title: Option<String>, artist: Option<String> },
    TrackCreated { pipeline: Pipeline, index: usize, total: usize, path: PathBuf },
    /// None of the track's contributors has the pipeline's capability.
    TrackSkipped { pipeline: Pipeline, index: usize, total: usize },
    Complete(MixSummary),
}
