use super::{Resolved, RetrieveOptions, Retriever};
use crate::cache::DownloadCache;
use crate::error::{ErrorKind, Result};
use crate::tool::{Tool, run};
use async_trait::async_trait;
use exn::ResultExt;
use rotamix_core::{MediaItem, MediaRef, Origin};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::instrument;

const AUDIO_FORMAT: &str = "bestaudio/best";
const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// The subset of yt-dlp's JSON info dict that is used. Playlists carry
/// `entries`; a single video is its own entry. Unavailable playlist entries
/// are listed as `null`.
#[derive(Debug, Default, Deserialize)]
struct Listing {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    creator: Option<String>,
    artist: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    entries: Option<Vec<Option<Listing>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    id: String,
    url: String,
    title: String,
    artist: Option<String>,
}
impl Entry {
    fn from_listing(listing: Listing, fallback_url: Option<&str>) -> Option<Self> {
        let id = listing.id.filter(|id| !id.is_empty())?;
        let url = listing
            .webpage_url
            .or(listing.url)
            .or_else(|| fallback_url.map(str::to_string))
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={id}"));
        Some(Self {
            title: listing.title.unwrap_or_else(|| id.clone()),
            artist: listing.uploader.or(listing.creator).or(listing.artist),
            url,
            id,
        })
    }

    fn audio_file(&self) -> String {
        format!("{}.mp3", self.id)
    }

    fn video_file(&self) -> String {
        format!("{}_video.mp4", self.id)
    }

    fn item(&self, audio: Option<MediaRef>, video: Option<MediaRef>) -> Option<MediaItem> {
        let item = MediaItem::new(audio, video).ok()?.with_title(&self.title);
        Some(match &self.artist {
            Some(artist) => item.with_artist(artist),
            None => item,
        })
    }
}

/// Splits a listing into usable entries and a count of unusable ones.
fn entries(listing: Listing, location: &str) -> (Vec<Entry>, usize) {
    match listing.entries {
        Some(children) => {
            let total = children.len();
            let entries: Vec<_> = children.into_iter().flatten().filter_map(|e| Entry::from_listing(e, None)).collect();
            let skipped = total - entries.len();
            (entries, skipped)
        },
        None => match Entry::from_listing(listing, Some(location)) {
            Some(entry) => (vec![entry], 0),
            None => (Vec::new(), 1),
        },
    }
}

/// Lists and downloads remote playlists and videos with `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpRetriever {
    binary: PathBuf,
    cookies: Option<PathBuf>,
    cache: Option<DownloadCache>,
    audio_quality: String,
}
impl YtDlpRetriever {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), cookies: None, cache: None, audio_quality: "320K".to_string() }
    }

    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_cache(mut self, cache: Option<DownloadCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Target MP3 bitrate, e.g. `320k`.
    pub fn with_audio_bitrate(mut self, bitrate: &str) -> Self {
        self.audio_quality = bitrate.to_ascii_uppercase();
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(["--no-warnings", "--no-progress"]);
        if let Some(cookies) = &self.cookies {
            command.arg("--cookies").arg(cookies);
        }
        command
    }

    async fn list(&self, origin: &Origin) -> Result<Listing> {
        let mut command = self.command();
        command.args(["--flat-playlist", "--dump-single-json"]).arg(origin.location());
        let output = run(Tool::YtDlp, &mut command)
            .await
            .or_raise(|| ErrorKind::Unresolvable(format!("yt-dlp could not list {origin}")))?;
        serde_json::from_slice(&output.stdout)
            .or_raise(|| ErrorKind::Unresolvable(format!("yt-dlp returned an unreadable listing for {origin}")))
    }

    /// Downloads one file of `entry` into `scratch`, going through the cache.
    /// Returns the local path and whether it came from the cache.
    async fn fetch(&self, entry: &Entry, video: bool, scratch: &Path) -> Result<(PathBuf, bool)> {
        let key = match video {
            true => entry.video_file(),
            false => entry.audio_file(),
        };
        let dest = scratch.join(&key);
        if let Some(cache) = &self.cache
            && cache.fetch(&key, &dest).await
        {
            return Ok((dest, true));
        }

        let template = scratch.join(match video {
            true => "%(id)s_video.%(ext)s",
            false => "%(id)s.%(ext)s",
        });
        let mut command = self.command();
        command.arg("--no-playlist").arg("-o").arg(&template);
        match video {
            true => command.args(["-f", VIDEO_FORMAT, "--merge-output-format", "mp4"]),
            false => command
                .args(["-f", AUDIO_FORMAT, "-x", "--audio-format", "mp3", "--audio-quality"])
                .arg(&self.audio_quality),
        };
        command.arg(&entry.url);
        run(Tool::YtDlp, &mut command).await?;
        if !tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            exn::bail!(ErrorKind::ToolFailed(format!("yt-dlp produced no {key}")));
        }
        if let Some(cache) = &self.cache {
            cache.store(&key, &dest).await;
        }
        Ok((dest, false))
    }

    async fn try_fetch(&self, entry: &Entry, video: bool, scratch: &Path) -> Option<(MediaRef, bool)> {
        match self.fetch(entry, video, scratch).await {
            Ok((path, hit)) => Some((MediaRef::Local(path), hit)),
            Err(e) => {
                tracing::warn!(id = %entry.id, video, error = %&*e, "Download failed");
                None
            },
        }
    }
}

#[async_trait]
impl Retriever for YtDlpRetriever {
    #[instrument(skip_all, fields(origin = %origin, video = options.video, list_only = options.list_only))]
    async fn resolve(&self, origin: &Origin, options: &RetrieveOptions, scratch: &Path) -> Result<Resolved> {
        let listing = self.list(origin).await?;
        let (entries, mut skipped) = entries(listing, origin.location());
        tracing::debug!(entries = entries.len(), unavailable = skipped, "Remote listing received");

        if options.list_only {
            let items = entries
                .iter()
                .filter_map(|entry| {
                    let remote = || Some(MediaRef::Remote(entry.url.clone()));
                    entry.item(remote(), remote().filter(|_| options.video))
                })
                .collect();
            return Ok(Resolved { items, skipped, cached: 0 });
        }

        tokio::fs::create_dir_all(scratch).await.map_err(ErrorKind::Io)?;
        let mut resolved = Resolved::default();
        for entry in &entries {
            let audio = self.try_fetch(entry, false, scratch).await;
            let video = match options.video {
                true => self.try_fetch(entry, true, scratch).await,
                false => None,
            };
            let cached = [&audio, &video].into_iter().flatten().any(|(_, hit)| *hit);
            match entry.item(audio.map(|(r, _)| r), video.map(|(r, _)| r)) {
                Some(item) => {
                    resolved.items.push(item);
                    resolved.cached += usize::from(cached);
                },
                None => skipped += 1,
            }
        }
        resolved.skipped = skipped;
        Ok(resolved)
    }
}
