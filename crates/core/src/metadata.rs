//! Per-track title and artist composition.

use crate::source::MediaItem;

/// Joins titles and artists of the items combined into one track.
pub const SEPARATOR: &str = " • ";
/// Longest combined title (in characters) kept before falling back.
pub const MAX_TITLE_CHARS: usize = 80;
/// Artist used when none of the contributors has one.
pub const VARIOUS_ARTISTS: &str = "Various Artists";

/// Tag values for one combined audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    /// 1-based track number.
    pub number: usize,
    pub total: usize,
}
impl TrackMetadata {
    /// The `number/total` form used by track-number tags.
    pub fn position(&self) -> String {
        format!("{}/{}", self.number, self.total)
    }
}

/// Composes the title and artist of track `track_index` (1-based) out of
/// `total_tracks`.
///
/// Only items that carry audio count as contributors; an item without audio
/// adds nothing to an audio track, so neither its title nor its artist is
/// used. Titles and artists are joined with [`SEPARATOR`] in source order,
/// skipping unknown values. A joined title longer than [`MAX_TITLE_CHARS`]
/// characters is replaced by `Track NN (from N sources)`, never truncated.
/// Without any known artist the artist is [`VARIOUS_ARTISTS`].
pub fn compose<'a>(
    contributors: impl IntoIterator<Item = &'a MediaItem>,
    track_index: usize,
    total_tracks: usize,
) -> TrackMetadata {
    let contributors: Vec<_> = contributors.into_iter().filter(|item| item.has_audio()).collect();
    let title = join(contributors.iter().filter_map(|item| item.title.as_deref()));
    let title = match title.chars().count() > MAX_TITLE_CHARS {
        true => format!("Track {track_index:02} (from {} sources)", contributors.len()),
        false => title,
    };
    let artist = join(contributors.iter().filter_map(|item| item.artist.as_deref()));
    let artist = match artist.is_empty() {
        true => VARIOUS_ARTISTS.to_string(),
        false => artist,
    };
    TrackMetadata { title, artist, number: track_index, total: total_tracks }
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(SEPARATOR)
}
