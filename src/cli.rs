//! Command-line arguments.

use clap::{ArgAction, Parser};
use rotamix_config::{Config, TrimConfig, usable_minutes};
use std::path::PathBuf;

/// Interleave playlists and music folders into rotated, combined tracks.
///
/// Track N combines item N of every source; shorter sources start over from
/// their first item once they run out.
#[derive(Debug, Parser)]
#[command(name = "rotamix", version, about, long_about = None)]
pub(crate) struct Args {
    /// Remote playlist/video URLs or local directories, in rotation order.
    #[arg(required = true, num_args = 1..)]
    pub sources: Vec<String>,

    /// Album name used for the output directory and the album tag.
    #[arg(long, default_value = "run-1")]
    pub album: String,

    /// Also produce combined MP4 videos.
    #[arg(long)]
    pub mp4out: bool,

    /// Plan and compose metadata without downloading, encoding or writing.
    #[arg(long)]
    pub dry_run: bool,

    /// Descend into subdirectories of local sources.
    #[arg(long)]
    pub recurse: bool,

    /// Inputs longer than this many minutes are trimmed.
    #[arg(long, value_name = "MINUTES", requires = "long_mp3_cutoff", value_parser = positive_minutes)]
    pub long_mp3_max: Option<f64>,

    /// Minutes kept of a trimmed input.
    #[arg(long, value_name = "MINUTES", requires = "long_mp3_max", value_parser = positive_minutes)]
    pub long_mp3_cutoff: Option<f64>,

    /// Cookies file passed to yt-dlp.
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Parent directory of the album directory.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// More logging; repeat for even more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
impl Args {
    /// Flags take precedence over every configuration layer.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(cookies) = &self.cookies {
            config.tools.cookies = Some(cookies.clone());
        }
        if let (Some(max_minutes), Some(cutoff_minutes)) = (self.long_mp3_max, self.long_mp3_cutoff) {
            config.audio.trim = Some(TrimConfig { max_minutes, cutoff_minutes });
        }
    }

    /// Default log filter for the `-v` count; `RUST_LOG` overrides it.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "rotamix=info",
            1 => "rotamix=debug",
            _ => "rotamix=trace",
        }
    }
}

fn positive_minutes(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(minutes) if usable_minutes(minutes) => Ok(minutes),
        Ok(_) => Err("must be a positive, finite number of minutes".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("rotamix").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["./music"]).unwrap();
        assert_eq!(args.sources, ["./music"]);
        assert_eq!(args.album, "run-1");
        assert!(!args.mp4out && !args.dry_run && !args.recurse);
        assert_eq!(args.log_filter(), "rotamix=info");
    }

    #[test]
    fn test_sources_keep_order() {
        let args = parse(&["--album", "Mix", "b", "https://youtu.be/x", "a", "--mp4out"]).unwrap();
        assert_eq!(args.sources, ["b", "https://youtu.be/x", "a"]);
        assert_eq!(args.album, "Mix");
        assert!(args.mp4out);
    }

    #[rstest]
    #[case::no_sources(&[])]
    #[case::max_without_cutoff(&["a", "--long-mp3-max", "10"])]
    #[case::cutoff_without_max(&["a", "--long-mp3-cutoff", "5"])]
    #[case::zero_minutes(&["a", "--long-mp3-max", "0", "--long-mp3-cutoff", "5"])]
    #[case::not_a_number(&["a", "--long-mp3-max", "ten", "--long-mp3-cutoff", "5"])]
    #[case::nan(&["a", "--long-mp3-max", "nan", "--long-mp3-cutoff", "5"])]
    #[case::infinite(&["a", "--long-mp3-max", "inf", "--long-mp3-cutoff", "5"])]
    #[case::too_large(&["--dry-run", "--long-mp3-max", "1e300", "--long-mp3-cutoff", "1", "a"])]
    fn test_rejected(#[case] args: &[&str]) {
        assert!(parse(args).is_err());
    }

    #[rstest]
    #[case(&["a"], "rotamix=info")]
    #[case(&["a", "-v"], "rotamix=debug")]
    #[case(&["a", "-vv"], "rotamix=trace")]
    #[case(&["a", "-vvv"], "rotamix=trace")]
    fn test_verbosity(#[case] args: &[&str], #[case] filter: &str) {
        assert_eq!(parse(args).unwrap().log_filter(), filter);
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&[
            "a",
            "--output-dir",
            "/tmp/mixes",
            "--cookies",
            "cookies.txt",
            "--long-mp3-max",
            "20",
            "--long-mp3-cutoff",
            "7.5",
        ])
        .unwrap();
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/mixes"));
        assert_eq!(config.tools.cookies, Some(PathBuf::from("cookies.txt")));
        assert_eq!(config.audio.trim, Some(TrimConfig { max_minutes: 20.0, cutoff_minutes: 7.5 }));
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = Config::default();
        config.output.dir = PathBuf::from("configured");
        parse(&["a"]).unwrap().apply(&mut config);
        assert_eq!(config.output.dir, PathBuf::from("configured"));
        assert_eq!(config.audio.trim, None);
    }
}
