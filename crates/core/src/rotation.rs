//! Circular rotation planning.
//!
//! Given the sources of one pipeline, the plan has one track per item of the
//! longest source. Track `t` (0-based) takes item `t mod len` from every
//! source, so shorter sources start over from their first item once they run
//! out:
//!
//! ```text
//! lengths 5, 1, 3   track:  1  2  3  4  5
//! source 1 position         1  2  3  4  5
//! source 2 position         1  1  1  1  1
//! source 3 position         1  2  3  1  2
//! ```

use crate::error::{ErrorKind, Result};
use crate::pipeline::Pipeline;
use crate::source::{MediaItem, Source};
use crate::track::Track;
use tracing::instrument;

/// Reference to the item a single source contributes to a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Index into the planned source list.
    pub source: usize,
    /// 0-based position in that source's items.
    pub position: usize,
}

/// The rotation of one pipeline: how many tracks, and which item of every
/// source goes into each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPlan<'a> {
    sources: &'a [Source],
    assignments: Vec<Vec<Slot>>,
}
impl<'a> RotationPlan<'a> {
    pub fn track_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn sources(&self) -> &'a [Source] {
        self.sources
    }

    /// Slots of the 0-based `track`, in source order.
    pub fn slots(&self, track: usize) -> Option<&[Slot]> {
        self.assignments.get(track).map(Vec::as_slice)
    }

    /// The items assigned to the 0-based `track`, in source order.
    pub fn contributors(&self, track: usize) -> Option<Vec<&'a MediaItem>> {
        let sources = self.sources;
        let slots = self.assignments.get(track)?;
        Some(slots.iter().map(|slot| &sources[slot.source].items()[slot.position]).collect())
    }

    /// Materialises every track of the plan for `pipeline`, numbered from 1.
    ///
    /// Audio tracks get their metadata composed here, once.
    pub fn tracks(&self, pipeline: Pipeline) -> Vec<Track> {
        let total = self.track_count();
        (0..total)
            .filter_map(|t| {
                let contributors = self.contributors(t)?.into_iter().cloned().collect();
                Some(Track::new(pipeline, t + 1, total, contributors))
            })
            .collect()
    }
}

/// Plans the rotation for one already-filtered pipeline source list.
///
/// Fails with [`ErrorKind::EmptySourceSet`] when `sources` is empty; whether
/// that matters is up to the caller. The result depends only on the order and
/// lengths of `sources`, so repeated calls yield identical plans.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn plan(sources: &[Source]) -> Result<RotationPlan<'_>> {
    if sources.is_empty() {
        exn::bail!(ErrorKind::EmptySourceSet);
    }
    let track_count = sources.iter().map(Source::len).max().unwrap_or(0);
    let assignments = (0..track_count)
        .map(|t| {
            sources
                .iter()
                .enumerate()
                // Validated sources are never empty, but `checked_rem` keeps
                // an empty one from dividing by zero: it contributes nothing.
                .filter_map(|(source, s)| t.checked_rem(s.len()).map(|position| Slot { source, position }))
                .collect()
        })
        .collect();
    tracing::debug!(tracks = track_count, "Rotation planned");
    Ok(RotationPlan { sources, assignments })
}
