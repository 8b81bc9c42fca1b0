//! Layered configuration.
//!
//! Precedence, lowest first: built-in defaults, the user's config file
//! (`config.{toml,yaml,json}` in the platform config directory), an explicit
//! file, `ROTAMIX_*` environment variables (`__` separates sections, e.g.
//! `ROTAMIX_CACHE__EXPIRY_HOURS=48`) and finally the legacy `OUTPUT_DIR`
//! variable. Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "ROTAMIX_";
const LEGACY_OUTPUT_ENV: &str = "OUTPUT_DIR";
const SECONDS_PER_HOUR: u64 = 3600;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub cache: CacheConfig,
    pub audio: AudioConfig,
    pub video: VideoConfig,
    pub concurrency: ConcurrencyConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Parent of the per-album output directories.
    pub dir: PathBuf,
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("output") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Age after which a cached download is discarded.
    pub expiry_hours: u64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, dir: PathBuf::from(".YTCACHE"), expiry_hours: 24 }
    }
}
impl CacheConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_hours.saturating_mul(SECONDS_PER_HOUR))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub bitrate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<TrimConfig>,
}
impl Default for AudioConfig {
    fn default() -> Self {
        Self { bitrate: "320k".to_string(), trim: None }
    }
}

/// Truncation of overly long audio inputs.
///
/// An input longer than `max_minutes` only contributes its first
/// `cutoff_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimConfig {
    pub max_minutes: f64,
    pub cutoff_minutes: f64,
}
impl TrimConfig {
    /// Clamps a cutoff that exceeds the maximum down to the maximum.
    pub fn normalized(self) -> Self {
        if self.cutoff_minutes > self.max_minutes {
            tracing::warn!(
                cutoff = self.cutoff_minutes,
                max = self.max_minutes,
                "Long-MP3 cutoff exceeds the maximum; using the maximum"
            );
            return Self { cutoff_minutes: self.max_minutes, ..self };
        }
        self
    }
}

/// Normalization applied to every video input before concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub crf: u8,
    pub preset: String,
    pub audio_bitrate: String,
}
impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            crf: 23,
            preset: "medium".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Sources retrieved at the same time.
    pub retrieve: usize,
    /// Tracks encoded at the same time.
    pub encode: usize,
}
impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { retrieve: 4, encode: 1 }
    }
}

/// Explicit tool locations; anything unset is looked up on `PATH`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffprobe: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yt_dlp: Option<PathBuf>,
    /// Cookies file handed to yt-dlp for restricted videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<PathBuf>,
}

impl Config {
    /// Loads and validates the full layered configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dirs) = ProjectDirs::from("", "", "rotamix") {
            let dir = dirs.config_dir();
            tracing::debug!(dir = %dir.display(), "Looking for user configuration");
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            figment = Self::merge_file(figment, path)?;
        }
        let figment = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&[LEGACY_OUTPUT_ENV]).map(|_| "output.dir".into()));
        Self::from_figment(figment)
    }

    /// Merges one file on top of `figment`, picking the format from the
    /// file extension.
    pub fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    /// Extracts and validates a configuration from an assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency.retrieve == 0 || self.concurrency.encode == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency limits must be at least 1".to_string()));
        }
        if self.video.width == 0 || self.video.height == 0 || self.video.fps == 0 {
            exn::bail!(ErrorKind::Invalid("video dimensions and frame rate must be positive".to_string()));
        }
        if let Some(trim) = self.audio.trim
            && !(usable_minutes(trim.max_minutes) && usable_minutes(trim.cutoff_minutes))
        {
            exn::bail!(ErrorKind::Invalid("long-MP3 limits must be positive, finite numbers of minutes".to_string()));
        }
        if self.cache.expiry_hours.checked_mul(SECONDS_PER_HOUR).is_none() {
            exn::bail!(ErrorKind::Invalid("cache expiry is out of range".to_string()));
        }
        Ok(())
    }
}

/// Whether `minutes` is positive and representable as a [`Duration`].
pub fn usable_minutes(minutes: f64) -> bool {
    minutes > 0.0 && Duration::try_from_secs_f64(minutes * 60.0).is_ok()
}
