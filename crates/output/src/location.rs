use crate::error::{ErrorKind, Result};
use crate::sanitize::sanitize_album_name;
use exn::ResultExt;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::iter;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// Highest `.N` suffix probed before falling back to a timestamped name.
const MAX_VERSION: usize = 999;
const PARTIAL_PREFIX: &str = ".partial-";

/// A created, run-exclusive output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    dir: PathBuf,
    album: String,
}
impl OutputLocation {
    /// Creates the output directory for `album` under `base_dir`.
    ///
    /// The album name is sanitized first, then `name`, `name.1`, `name.2`, ...
    /// are tried in turn. Each candidate is claimed with a single create call
    /// that fails if the directory already exists, so two runs can never end
    /// up sharing a directory. After `name.999` the name falls back to
    /// `name_{YYYYmmdd_HHMMSS}`. Missing parents of `base_dir` are created.
    pub fn resolve(base_dir: impl AsRef<Path>, album: &str) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let album = sanitize_album_name(album);
        fs::create_dir_all(base_dir).or_raise(|| ErrorKind::OutputLocation(base_dir.to_path_buf()))?;

        let candidates = iter::once(album.clone())
            .chain((1..=MAX_VERSION).map(|n| format!("{album}.{n}")))
            .chain(iter::once_with(|| format!("{album}_{}", timestamp())));
        for name in candidates {
            let dir = base_dir.join(&name);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    tracing::debug!(dir = %dir.display(), "Output directory created");
                    return Ok(Self { dir, album: album.clone() });
                },
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e).or_raise(|| ErrorKind::OutputLocation(dir)),
            }
        }
        exn::bail!(ErrorKind::OutputLocation(base_dir.join(&album)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The sanitized album name the directory was derived from.
    pub fn album(&self) -> &str {
        &self.album
    }

    /// Final path of track `index` in a pipeline producing `total` tracks.
    pub fn track_path(&self, index: usize, total: usize, extension: &str) -> PathBuf {
        self.dir.join(track_file_name(index, total, extension))
    }

    /// Where track `index` is written while it is being produced. The file
    /// keeps the final extension so the encoder can infer the format.
    pub fn partial_path(&self, index: usize, total: usize, extension: &str) -> PathBuf {
        self.dir.join(format!("{PARTIAL_PREFIX}{}", track_file_name(index, total, extension)))
    }
}

/// `track-{index}.{ext}`, zero-padded to the digits of `total` (at least 2).
fn track_file_name(index: usize, total: usize, extension: &str) -> String {
    let width = total.max(index).to_string().len().max(2);
    format!("track-{index:0width$}.{extension}")
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
