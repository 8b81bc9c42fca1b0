//! Collaborator doubles for tests.
//!
//! They behave like the real implementations where it matters to callers:
//! "downloads" are real files in the scratch directory, and encoders write
//! their output before reporting success or a configured failure.

use crate::encode::{Encoder, NormalizationSpec};
use crate::error::{ErrorKind, Result};
use crate::retrieve::{Resolved, RetrieveOptions, Retriever};
use crate::tag::TagWriter;
use async_trait::async_trait;
use exn::ResultExt;
use rotamix_core::{MediaItem, MediaRef, Origin, TrackMetadata};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct MockSource {
    items: Vec<MediaItem>,
    downloads: Vec<(String, bool)>,
    skipped: usize,
    delay: Option<Duration>,
    failure: Option<String>,
}

/// Resolves origins from a fixed table. Unknown origins are unresolvable.
#[derive(Debug, Default)]
pub struct MockRetriever {
    sources: HashMap<String, MockSource>,
    calls: Mutex<Vec<String>>,
    scratch_dirs: Mutex<Vec<PathBuf>>,
}
impl MockRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `origin` to already-existing items.
    pub fn with_items(mut self, origin: &str, items: impl IntoIterator<Item = MediaItem>) -> Self {
        self.sources.entry(origin.to_string()).or_default().items.extend(items);
        self
    }

    /// Resolves `origin` by writing `{name}.mp3` (and `{name}.mp4` when video
    /// is requested and `video` is set) into the scratch directory, one item
    /// per name, titled after it. Planning-only runs get remote references.
    pub fn with_downloads(mut self, origin: &str, names: &[&str], video: bool) -> Self {
        let source = self.sources.entry(origin.to_string()).or_default();
        source.downloads.extend(names.iter().map(|n| (n.to_string(), video)));
        self
    }

    pub fn with_skipped(mut self, origin: &str, skipped: usize) -> Self {
        self.sources.entry(origin.to_string()).or_default().skipped = skipped;
        self
    }

    pub fn with_delay(mut self, origin: &str, delay: Duration) -> Self {
        self.sources.entry(origin.to_string()).or_default().delay = Some(delay);
        self
    }

    pub fn with_failure(mut self, origin: &str, message: &str) -> Self {
        self.sources.entry(origin.to_string()).or_default().failure = Some(message.to_string());
        self
    }

    /// Origins resolved so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Scratch directories handed to [`resolve`](Retriever::resolve), in
    /// call order.
    pub fn scratch_dirs(&self) -> Vec<PathBuf> {
        self.scratch_dirs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn resolve(&self, origin: &Origin, options: &RetrieveOptions, scratch: &Path) -> Result<Resolved> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(origin.location().to_string());
        self.scratch_dirs.lock().unwrap_or_else(PoisonError::into_inner).push(scratch.to_path_buf());
        let Some(source) = self.sources.get(origin.location()) else {
            exn::bail!(ErrorKind::Unresolvable(format!("unknown origin {origin}")));
        };
        if let Some(delay) = source.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &source.failure {
            exn::bail!(ErrorKind::Unresolvable(message.clone()));
        }

        let mut items = source.items.clone();
        if !source.downloads.is_empty() && !options.list_only {
            tokio::fs::create_dir_all(scratch).await.map_err(ErrorKind::Io)?;
        }
        for (name, has_video) in &source.downloads {
            let with_video = *has_video && options.video;
            let (audio, video) = match options.list_only {
                true => (
                    MediaRef::Remote(format!("mock://{name}.mp3")),
                    with_video.then(|| MediaRef::Remote(format!("mock://{name}.mp4"))),
                ),
                false => {
                    let audio = scratch.join(format!("{name}.mp3"));
                    tokio::fs::write(&audio, name.as_bytes()).await.map_err(ErrorKind::Io)?;
                    let video = match with_video {
                        true => {
                            let video = scratch.join(format!("{name}.mp4"));
                            tokio::fs::write(&video, name.as_bytes()).await.map_err(ErrorKind::Io)?;
                            Some(MediaRef::Local(video))
                        },
                        false => None,
                    };
                    (MediaRef::Local(audio), video)
                },
            };
            let item = MediaItem::new(Some(audio), video).or_raise(|| ErrorKind::Unresolvable(name.clone()))?;
            items.push(item.with_title(name.as_str()));
        }
        Ok(Resolved { items, skipped: source.skipped, cached: 0 })
    }
}

/// One recorded [`MockEncoder`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCall {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Writes the concatenated input file contents to the output. Outputs whose
/// file name ends with a configured suffix are written, then failed.
#[derive(Debug, Default)]
pub struct MockEncoder {
    fail_suffixes: Vec<String>,
    calls: Mutex<Vec<EncodeCall>>,
}
impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every output whose file name ends with `suffix`, e.g. `track-02.mp3`.
    pub fn failing_on(mut self, suffix: &str) -> Self {
        self.fail_suffixes.push(suffix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EncodeCall { inputs: inputs.to_vec(), output: output.to_path_buf() });
        let mut contents = Vec::new();
        for input in inputs {
            contents.extend(tokio::fs::read(input).await.map_err(ErrorKind::Io)?);
        }
        tokio::fs::write(output, contents).await.map_err(ErrorKind::Io)?;
        let name = output.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if self.fail_suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            exn::bail!(ErrorKind::ToolFailed(format!("mock encoder refused {name}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    async fn combine_audio(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        self.combine(inputs, output).await
    }

    async fn combine_video(
        &self,
        inputs: &[PathBuf],
        _spec: &NormalizationSpec,
        output: &Path,
        scratch: &Path,
    ) -> Result<()> {
        tokio::fs::create_dir_all(scratch).await.map_err(ErrorKind::Io)?;
        tokio::fs::write(scratch.join("concat_list.txt"), b"").await.map_err(ErrorKind::Io)?;
        self.combine(inputs, output).await
    }
}

/// One recorded [`MockTagWriter`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCall {
    pub path: PathBuf,
    pub album: String,
    pub metadata: TrackMetadata,
}

#[derive(Debug, Default)]
pub struct MockTagWriter {
    calls: Mutex<Vec<TagCall>>,
}
impl MockTagWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TagCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl TagWriter for MockTagWriter {
    async fn write_tags(&self, path: &Path, album: &str, metadata: &TrackMetadata) -> Result<()> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            exn::bail!(ErrorKind::Tag(path.to_path_buf()));
        }
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(TagCall {
            path: path.to_path_buf(),
            album: album.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }
}
