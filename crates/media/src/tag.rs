use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use id3::{Tag, TagLike, Version};
use rotamix_core::TrackMetadata;
use std::path::Path;
use std::sync::Arc;

pub type TagWriterHandle = Arc<dyn TagWriter + Send + Sync>;

#[async_trait]
pub trait TagWriter {
    /// Persists album, title, artist and `number/total` position on the
    /// finished audio file at `path`.
    async fn write_tags(&self, path: &Path, album: &str, metadata: &TrackMetadata) -> Result<()>;
}

/// Writes ID3v2.4 tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3TagWriter;

#[async_trait]
impl TagWriter for Id3TagWriter {
    async fn write_tags(&self, path: &Path, album: &str, metadata: &TrackMetadata) -> Result<()> {
        let (path, album, metadata) = (path.to_path_buf(), album.to_string(), metadata.clone());
        let failed = || ErrorKind::Tag(path.clone());
        // id3 only does blocking file I/O.
        tokio::task::spawn_blocking({
            let path = path.clone();
            move || write_blocking(&path, &album, &metadata)
        })
        .await
        .or_raise(failed)?
    }
}

fn write_blocking(path: &Path, album: &str, metadata: &TrackMetadata) -> Result<()> {
    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::new());
    match metadata.title.is_empty() {
        true => tag.remove_title(),
        false => tag.set_title(metadata.title.as_str()),
    }
    tag.set_album(album);
    tag.set_artist(metadata.artist.as_str());
    tag.set_text("TRCK", metadata.position());
    tag.write_to_path(path, Version::Id3v24).or_raise(|| ErrorKind::Tag(path.to_path_buf()))?;
    tracing::trace!(path = %path.display(), title = %metadata.title, "Tags written");
    Ok(())
}
