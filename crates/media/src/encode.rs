//! Combining the inputs of one track into a single output file.

use crate::error::{ErrorKind, Result};
use crate::tool::{Tool, run};
use async_trait::async_trait;
use exn::ResultExt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::instrument;

pub type EncoderHandle = Arc<dyn Encoder + Send + Sync>;

/// Target format every video input is brought to before concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationSpec {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub crf: u8,
    pub preset: String,
    pub audio_bitrate: String,
}
impl NormalizationSpec {
    /// Scales into the target frame keeping the source aspect ratio, then
    /// letterboxes/pillarboxes to the exact size.
    pub fn filter(&self) -> String {
        let Self { width: w, height: h, fps, .. } = self;
        format!("scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}")
    }
}
impl Default for NormalizationSpec {
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

/// Truncation of long audio inputs: anything longer than `max` only
/// contributes its first `cutoff`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimPolicy {
    pub max: Duration,
    pub cutoff: Duration,
}
impl TrimPolicy {
    /// `None` unless both values are positive and fit a [`Duration`].
    pub fn from_minutes(max: f64, cutoff: f64) -> Option<Self> {
        let minutes = |value: f64| match value > 0.0 {
            true => Duration::try_from_secs_f64(value * 60.0).ok(),
            false => None,
        };
        Some(Self { max: minutes(max)?, cutoff: minutes(cutoff.min(max))? })
    }

    /// How much of an input of length `duration` to keep, if it is trimmed.
    pub fn limit(&self, duration: Duration) -> Option<Duration> {
        (duration > self.max).then_some(self.cutoff)
    }
}

#[async_trait]
pub trait Encoder {
    /// Concatenates audio `inputs`, in order, into one MP3 at `output`.
    async fn combine_audio(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Normalizes every video input to `spec` and concatenates them into one
    /// MP4 at `output`. Intermediate files go below `scratch`.
    async fn combine_video(&self, inputs: &[PathBuf], spec: &NormalizationSpec, output: &Path, scratch: &Path)
    -> Result<()>;
}

/// [`Encoder`] driving `ffmpeg`, with `ffprobe` for input durations.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    audio_bitrate: String,
    trim: Option<TrimPolicy>,
}
impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self { ffmpeg: ffmpeg.into(), ffprobe: ffprobe.into(), audio_bitrate: "320k".to_string(), trim: None }
    }

    pub fn with_audio_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.audio_bitrate = bitrate.into();
        self
    }

    pub fn with_trim(mut self, trim: Option<TrimPolicy>) -> Self {
        self.trim = trim;
        self
    }

    fn ffmpeg(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg);
        command.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]);
        command
    }

    async fn probe_duration(&self, input: &Path) -> Result<Duration> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(input);
        let output = run(Tool::Ffprobe, &mut command).await.or_raise(|| ErrorKind::Probe(input.to_path_buf()))?;
        let seconds = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0);
        match seconds {
            Some(seconds) => Ok(Duration::from_secs_f64(seconds)),
            None => exn::bail!(ErrorKind::Probe(input.to_path_buf())),
        }
    }

    async fn normalize(&self, input: &Path, spec: &NormalizationSpec, output: &Path) -> Result<()> {
        let mut command = self.ffmpeg();
        command
            .arg("-i")
            .arg(input)
            .args(["-vf", spec.filter().as_str()])
            .args(["-c:v", "libx264", "-preset", spec.preset.as_str(), "-pix_fmt", "yuv420p"])
            .args(["-crf", spec.crf.to_string().as_str()])
            .args(["-c:a", "aac", "-b:a", spec.audio_bitrate.as_str(), "-ar", "48000", "-ac", "2"])
            .arg(output);
        run(Tool::Ffmpeg, &mut command).await?;
        Ok(())
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    #[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
    async fn combine_audio(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let mut usable = Vec::with_capacity(inputs.len());
        for input in inputs {
            match self.probe_duration(input).await {
                Ok(duration) => {
                    let limit = self.trim.and_then(|trim| trim.limit(duration));
                    if let Some(limit) = limit {
                        tracing::info!(
                            input = %input.display(),
                            from_minutes = duration.as_secs_f64() / 60.0,
                            to_minutes = limit.as_secs_f64() / 60.0,
                            "Truncating long input"
                        );
                    }
                    usable.push((input, limit));
                },
                Err(e) => tracing::warn!(input = %input.display(), error = %&*e, "Skipping unreadable input"),
            }
        }
        if usable.is_empty() {
            exn::bail!(ErrorKind::NoUsableInputs);
        }

        let mut command = self.ffmpeg();
        for (input, limit) in &usable {
            if let Some(limit) = limit {
                command.arg("-t").arg(format!("{:.3}", limit.as_secs_f64()));
            }
            command.arg("-i").arg(input);
        }
        command
            .args(["-filter_complex", concat_filter(usable.len()).as_str()])
            .args(["-map", "[out]", "-map_metadata", "-1"])
            .args(["-c:a", "libmp3lame", "-b:a", self.audio_bitrate.as_str(), "-f", "mp3"])
            .arg(output);
        run(Tool::Ffmpeg, &mut command).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(inputs = inputs.len(), output = %output.display()))]
    async fn combine_video(
        &self,
        inputs: &[PathBuf],
        spec: &NormalizationSpec,
        output: &Path,
        scratch: &Path,
    ) -> Result<()> {
        if inputs.is_empty() {
            exn::bail!(ErrorKind::NoUsableInputs);
        }
        fs::create_dir_all(scratch).await.map_err(ErrorKind::Io)?;
        let mut normalized = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let target = scratch.join(format!("normalized_{i}.mp4"));
            self.normalize(input, spec, &target).await?;
            normalized.push(std::path::absolute(&target).map_err(ErrorKind::Io)?);
        }

        let list = scratch.join("concat_list.txt");
        fs::write(&list, concat_list(&normalized)).await.map_err(ErrorKind::Io)?;
        let mut command = self.ffmpeg();
        command
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&list)
            .args(["-c", "copy", "-f", "mp4"])
            .arg(output);
        run(Tool::Ffmpeg, &mut command).await?;
        Ok(())
    }
}

/// `[0:a][1:a]...concat=n=N:v=0:a=1[out]`
fn concat_filter(inputs: usize) -> String {
    let mut filter = String::new();
    for i in 0..inputs {
        let _ = write!(filter, "[{i}:a]");
    }
    let _ = write!(filter, "concat=n={inputs}:v=0:a=1[out]");
    filter
}

/// Concat demuxer list; single quotes inside paths are closed, escaped and
/// reopened.
fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, "[0:a]concat=n=1:v=0:a=1[out]")]
    #[case(3, "[0:a][1:a][2:a]concat=n=3:v=0:a=1[out]")]
    fn test_concat_filter(#[case] inputs: usize, #[case] expected: &str) {
        assert_eq!(concat_filter(inputs), expected);
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_normalization_filter() {
        let spec = NormalizationSpec { width: 1280, height: 720, fps: 25, ..NormalizationSpec::default() };
        assert_eq!(
            spec.filter(),
            "scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2,setsar=1,fps=25"
        );
    }

    #[rstest]
    #[case(10.0, 4.0, 11 * 60, Some(4 * 60))]
    #[case(10.0, 4.0, 9 * 60, None)]
    #[case(10.0, 4.0, 10 * 60, None)]
    // A cutoff above the maximum is clamped to it.
    #[case(5.0, 8.0, 6 * 60, Some(5 * 60))]
    fn test_trim_policy(#[case] max: f64, #[case] cutoff: f64, #[case] input: u64, #[case] kept: Option<u64>) {
        let policy = TrimPolicy::from_minutes(max, cutoff).unwrap();
        assert_eq!(policy.limit(Duration::from_secs(input)), kept.map(Duration::from_secs));
    }

    #[rstest]
    #[case(f64::NAN, 1.0)]
    #[case(f64::INFINITY, 1.0)]
    #[case(1e300, 1.0)]
    #[case(10.0, 0.0)]
    #[case(-1.0, -2.0)]
    fn test_trim_policy_out_of_range(#[case] max: f64, #[case] cutoff: f64) {
        assert_eq!(TrimPolicy::from_minutes(max, cutoff), None);
    }

    #[tokio::test]
    async fn test_no_readable_inputs() {
        let encoder = FfmpegEncoder::new("/nonexistent/ffmpeg", "/nonexistent/ffprobe");
        let err = encoder.combine_audio(&[PathBuf::from("missing.mp3")], Path::new("out.mp3")).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::NoUsableInputs));
    }

    #[tokio::test]
    async fn test_video_without_inputs() {
        let encoder = FfmpegEncoder::new("ffmpeg", "ffprobe");
        let spec = NormalizationSpec::default();
        let err = encoder.combine_video(&[], &spec, Path::new("out.mp4"), Path::new("scratch")).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::NoUsableInputs));
    }
}
