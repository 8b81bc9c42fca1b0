use super::{Resolved, RetrieveOptions, Retriever};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use id3::{Tag, TagLike};
use rotamix_core::{MediaItem, MediaRef, Origin};
use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Audio,
    Video,
}

/// Audio and video files sharing a stem in the same directory.
#[derive(Debug, Default)]
struct Pair {
    audio: Option<PathBuf>,
    video: Option<PathBuf>,
}

/// Scans a local directory for `.mp3` (and, for video runs, `.mp4`) files.
///
/// Files are taken in path order. An audio and a video file with the same
/// stem in the same directory become one item carrying both. Titles and
/// artists come from ID3 tags, falling back to the file stem for the title.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryRetriever;

#[async_trait]
impl Retriever for DirectoryRetriever {
    #[instrument(skip_all, fields(origin = %origin, recursive = options.recursive))]
    async fn resolve(&self, origin: &Origin, options: &RetrieveOptions, _scratch: &Path) -> Result<Resolved> {
        let root = PathBuf::from(origin.location());
        match fs::metadata(&root).await {
            Ok(metadata) if metadata.is_dir() => {},
            Ok(_) => exn::bail!(ErrorKind::Unresolvable(format!("not a directory: {}", root.display()))),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                exn::bail!(ErrorKind::Unresolvable(format!("directory not found: {}", root.display())))
            },
            Err(e) => {
                return Err(e).or_raise(|| ErrorKind::Unresolvable(format!("cannot read {}", root.display())));
            },
        }

        let mut pairs: BTreeMap<PathBuf, Pair> = BTreeMap::new();
        for (path, kind) in walk(&root, options).await? {
            let pair = pairs.entry(path.with_extension("")).or_default();
            match kind {
                Kind::Audio => pair.audio = Some(path),
                Kind::Video => pair.video = Some(path),
            }
        }
        // Tag reading is blocking file I/O.
        let items = tokio::task::spawn_blocking(move || pairs.into_values().filter_map(into_item).collect::<Vec<_>>())
            .await
            .or_raise(|| ErrorKind::Unresolvable(format!("cannot read tags below {}", root.display())))?;
        tracing::debug!(items = items.len(), "Directory scanned");
        Ok(Resolved { items, ..Resolved::default() })
    }
}

fn classify(path: &Path, video: bool) -> Option<Kind> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "mp3" => Some(Kind::Audio),
        "mp4" if video => Some(Kind::Video),
        _ => None,
    }
}

async fn walk(root: &Path, options: &RetrieveOptions) -> Result<Vec<(PathBuf, Kind)>> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if dir != root => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable subdirectory");
                continue;
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Unresolvable(format!("cannot read {}", dir.display()))),
        };
        while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
            let path = entry.path();
            // Follows symlinks; broken ones are silently dropped.
            let Ok(metadata) = fs::metadata(&path).await else {
                continue;
            };
            if metadata.is_dir() {
                if options.recursive {
                    stack.push(path);
                }
            } else if let Some(kind) = classify(&path, options.video)
                && metadata.is_file()
            {
                found.push((path, kind));
            }
        }
    }
    Ok(found)
}

fn into_item(pair: Pair) -> Option<MediaItem> {
    let stem = pair
        .audio
        .as_deref()
        .or(pair.video.as_deref())
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned());
    let (title, artist) = pair.audio.as_deref().map(read_tags).unwrap_or_default();
    let item = MediaItem::new(pair.audio.map(MediaRef::from), pair.video.map(MediaRef::from)).ok()?;
    let item = match title.or(stem) {
        Some(title) => item.with_title(title),
        None => item,
    };
    Some(match artist {
        Some(artist) => item.with_artist(artist),
        None => item,
    })
}

fn read_tags(path: &Path) -> (Option<String>, Option<String>) {
    match Tag::read_from_path(path) {
        Ok(tag) => (tag.title().map(str::to_string), tag.artist().map(str::to_string)),
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "No readable ID3 tag");
            (None, None)
        },
    }
}
