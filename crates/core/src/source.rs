//! Sources and the media items they resolve to.
//!
//! A [`Source`] is one origin supplied by the user (a remote playlist/video or
//! a local directory) together with the [`MediaItem`]s the retrieval layer
//! resolved from it. Item order is discovery order and never changes after
//! construction; the rotation arithmetic depends on it.

use crate::error::{ErrorKind, Result};
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::{convert::Infallible, str::FromStr};

const REMOTE_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];

/// Opaque handle to the content of one capability of a [`MediaItem`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaRef {
    /// A file on the local filesystem, usable by the encoder.
    Local(PathBuf),
    /// An item that was listed but not downloaded (planning-only runs).
    Remote(String),
}
impl MediaRef {
    /// The local path, if this reference points at a file on disk.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Remote(_) => None,
        }
    }
}
impl From<PathBuf> for MediaRef {
    fn from(path: PathBuf) -> Self {
        Self::Local(path)
    }
}
impl From<&Path> for MediaRef {
    fn from(path: &Path) -> Self {
        Self::Local(path.to_path_buf())
    }
}
impl Display for MediaRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// One resolved unit of audio and/or video content.
///
/// At least one of the two references is always present; the constructors
/// enforce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    audio: Option<MediaRef>,
    video: Option<MediaRef>,
    pub title: Option<String>,
    pub artist: Option<String>,
}
impl MediaItem {
    /// Creates an item from optional references, failing with
    /// [`ErrorKind::NoCapability`] when both are absent.
    pub fn new(audio: Option<MediaRef>, video: Option<MediaRef>) -> Result<Self> {
        if audio.is_none() && video.is_none() {
            exn::bail!(ErrorKind::NoCapability);
        }
        Ok(Self { audio, video, title: None, artist: None })
    }

    pub fn audio(audio: impl Into<MediaRef>) -> Self {
        Self { audio: Some(audio.into()), video: None, title: None, artist: None }
    }

    pub fn video(video: impl Into<MediaRef>) -> Self {
        Self { audio: None, video: Some(video.into()), title: None, artist: None }
    }

    pub fn audiovisual(audio: impl Into<MediaRef>, video: impl Into<MediaRef>) -> Self {
        Self {
            audio: Some(audio.into()),
            video: Some(video.into()),
            title: None,
            artist: None,
        }
    }

    /// Sets the title. Blank strings count as "unknown".
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into()).filter(|t: &String| !t.trim().is_empty());
        self
    }

    /// Sets the artist. Blank strings count as "unknown".
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into()).filter(|a: &String| !a.trim().is_empty());
        self
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn audio_ref(&self) -> Option<&MediaRef> {
        self.audio.as_ref()
    }

    pub fn video_ref(&self) -> Option<&MediaRef> {
        self.video.as_ref()
    }
}

/// Where a source's items come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A remote playlist or single remote video.
    RemoteCollection,
    /// A directory on the local filesystem.
    LocalCollection,
}

/// A user-supplied origin string, classified into a [`SourceKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    location: String,
    kind: SourceKind,
}
impl Origin {
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let lowered = location.to_lowercase();
        let kind = match REMOTE_HOSTS.iter().any(|host| lowered.contains(host)) {
            true => SourceKind::RemoteCollection,
            false => SourceKind::LocalCollection,
        };
        Self { location, kind }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_remote(&self) -> bool {
        self.kind == SourceKind::RemoteCollection
    }

    /// Remote origins carrying a `list=` query parameter are playlists.
    pub fn is_playlist(&self) -> bool {
        self.is_remote() && self.location.contains("list=")
    }

    /// Human-readable type of the origin, for reporting.
    pub fn describe(&self) -> &'static str {
        match (self.kind, self.is_playlist()) {
            (SourceKind::RemoteCollection, true) => "Remote Playlist",
            (SourceKind::RemoteCollection, false) => "Remote Video",
            (SourceKind::LocalCollection, _) => "Directory",
        }
    }
}
impl FromStr for Origin {
    type Err = Infallible;
    fn from_str(location: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(location))
    }
}
impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.location)
    }
}

/// One origin and its resolved, ordered, deduplicated items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    index: usize,
    origin: Origin,
    items: Vec<MediaItem>,
    /// Entries the retrieval layer could not resolve.
    pub skipped: usize,
    /// Entries that were served from the download cache.
    pub cached: usize,
}
impl Source {
    /// Creates a source from items in discovery order.
    ///
    /// `index` is the 1-based position of the origin on the command line.
    /// Items repeating an earlier item's references are dropped, keeping the
    /// first occurrence.
    pub fn new(index: usize, origin: Origin, items: impl IntoIterator<Item = MediaItem>) -> Self {
        let mut seen = HashSet::new();
        let items = items
            .into_iter()
            .filter(|item| seen.insert((item.audio.clone(), item.video.clone())))
            .collect();
        Self { index, origin, items, skipped: 0, cached: 0 }
    }

    pub fn with_skipped(mut self, skipped: usize) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn with_cached(mut self, cached: usize) -> Self {
        self.cached = cached;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn audio_count(&self) -> usize {
        self.items.iter().filter(|i| i.has_audio()).count()
    }

    pub fn video_count(&self) -> usize {
        self.items.iter().filter(|i| i.has_video()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://youtube.com/watch?v=test", SourceKind::RemoteCollection)]
    #[case("https://www.youtube.com/watch?v=test", SourceKind::RemoteCollection)]
    #[case("https://youtu.be/test", SourceKind::RemoteCollection)]
    #[case("https://m.YouTube.com/watch?v=test", SourceKind::RemoteCollection)]
    #[case("/path/to/music", SourceKind::LocalCollection)]
    #[case("https://example.com", SourceKind::LocalCollection)]
    #[case("", SourceKind::LocalCollection)]
    fn test_origin_kind(#[case] location: &str, #[case] expected: SourceKind) {
        assert_eq!(Origin::new(location).kind(), expected);
    }

    #[rstest]
    #[case("https://youtube.com/playlist?list=PLxxx", true)]
    #[case("https://youtube.com/watch?v=xxx&list=PLyyy", true)]
    #[case("https://youtube.com/watch?v=xxx", false)]
    // Local paths are never playlists, whatever they are named.
    #[case("/music/list=favourites", false)]
    fn test_origin_playlist(#[case] location: &str, #[case] expected: bool) {
        assert_eq!(Origin::new(location).is_playlist(), expected);
    }

    #[test]
    fn test_origin_describe() {
        assert_eq!(Origin::new("https://youtube.com/playlist?list=PL").describe(), "Remote Playlist");
        assert_eq!(Origin::new("https://youtu.be/abc").describe(), "Remote Video");
        assert_eq!(Origin::new("./music").describe(), "Directory");
    }

    #[test]
    fn test_item_requires_capability() {
        assert!(MediaItem::new(None, None).is_err());
        let item = MediaItem::new(Some(PathBuf::from("a.mp3").into()), None).unwrap();
        assert!(item.has_audio());
        assert!(!item.has_video());
    }

    #[test]
    fn test_blank_metadata_is_absent() {
        let item = MediaItem::audio(PathBuf::from("a.mp3")).with_title("   ").with_artist("");
        assert_eq!(item.title, None);
        assert_eq!(item.artist, None);
        let item = MediaItem::audio(PathBuf::from("a.mp3")).with_title("Song").with_artist("Singer");
        assert_eq!(item.title.as_deref(), Some("Song"));
        assert_eq!(item.artist.as_deref(), Some("Singer"));
    }

    #[test]
    fn test_source_deduplicates_keeping_order() {
        let items = [
            MediaItem::audio(PathBuf::from("b.mp3")),
            MediaItem::audio(PathBuf::from("a.mp3")),
            MediaItem::audio(PathBuf::from("b.mp3")).with_title("duplicate"),
            MediaItem::audiovisual(PathBuf::from("a.mp3"), PathBuf::from("a.mp4")),
        ];
        let source = Source::new(1, Origin::new("dir"), items);
        assert_eq!(source.len(), 3);
        assert_eq!(source.items()[0].audio_ref(), Some(&MediaRef::Local("b.mp3".into())));
        assert_eq!(source.items()[0].title, None);
        assert_eq!(source.items()[1].audio_ref(), Some(&MediaRef::Local("a.mp3".into())));
        assert!(source.items()[2].has_video());
    }

    #[test]
    fn test_source_capability_counts() {
        let items = [
            MediaItem::audio(PathBuf::from("1.mp3")),
            MediaItem::video(PathBuf::from("2.mp4")),
            MediaItem::audiovisual(PathBuf::from("3.mp3"), PathBuf::from("3.mp4")),
        ];
        let source = Source::new(2, Origin::new("dir"), items).with_skipped(4).with_cached(1);
        assert_eq!(source.audio_count(), 2);
        assert_eq!(source.video_count(), 2);
        assert_eq!(source.skipped, 4);
        assert_eq!(source.cached, 1);
        assert_eq!(source.index(), 2);
    }
}
