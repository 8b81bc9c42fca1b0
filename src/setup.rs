//! Turns arguments and configuration into a mix request and its collaborators.

use crate::cli::Args;
use derive_more::{Display, Error};
use exn::ResultExt;
use rotamix_config::{Config, TrimConfig};
use rotamix_core::Origin;
use rotamix_media::{
    DirectoryRetriever, DownloadCache, FfmpegEncoder, Id3TagWriter, NormalizationSpec, RetrieverHandle,
    RoutingRetriever, Tool, TrimPolicy, YtDlpRetriever,
};
use rotamix_mixer::{Collaborators, MixRequest};
use std::path::PathBuf;
use std::sync::Arc;

pub(crate) type Error = exn::Exn<ErrorKind>;
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("ffmpeg and ffprobe are required unless --dry-run is given")]
    Tools,
    #[display("long-MP3 limits must be positive, finite numbers of minutes")]
    Trim,
}

#[tracing::instrument(skip_all)]
pub(crate) fn prepare(args: &Args) -> Result<(MixRequest, Collaborators)> {
    let mut config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    args.apply(&mut config);
    let collaborators = collaborators(&config, args.dry_run)?;
    Ok((request(args, &config), collaborators))
}

pub(crate) fn request(args: &Args, config: &Config) -> MixRequest {
    let mut request = MixRequest::new(args.sources.iter().map(Origin::new), &args.album, &config.output.dir);
    request.video = args.mp4out;
    request.dry_run = args.dry_run;
    request.recursive = args.recurse;
    request.normalization = NormalizationSpec {
        width: config.video.width,
        height: config.video.height,
        fps: config.video.fps,
        crf: config.video.crf,
        preset: config.video.preset.clone(),
        audio_bitrate: config.video.audio_bitrate.clone(),
    };
    request.retrieve_concurrency = config.concurrency.retrieve;
    request.encode_concurrency = config.concurrency.encode;
    request
}

fn collaborators(config: &Config, dry_run: bool) -> Result<Collaborators> {
    let trim = match config.audio.trim.map(TrimConfig::normalized) {
        Some(trim) => match TrimPolicy::from_minutes(trim.max_minutes, trim.cutoff_minutes) {
            Some(policy) => Some(policy),
            None => exn::bail!(ErrorKind::Trim),
        },
        None => None,
    };
    let tools = &config.tools;
    let (ffmpeg, ffprobe) =
        match (Tool::Ffmpeg.locate(tools.ffmpeg.as_deref()), Tool::Ffprobe.locate(tools.ffprobe.as_deref())) {
            (Ok(ffmpeg), Ok(ffprobe)) => (ffmpeg, ffprobe),
            (Err(e), _) | (_, Err(e)) if !dry_run => return Err(e.raise(ErrorKind::Tools)),
            // Nothing is encoded in a dry run.
            _ => (PathBuf::from("ffmpeg"), PathBuf::from("ffprobe")),
        };
    let encoder = FfmpegEncoder::new(ffmpeg, ffprobe).with_audio_bitrate(&config.audio.bitrate).with_trim(trim);

    let cache = config
        .cache
        .enabled
        .then(|| DownloadCache::new(&config.cache.dir, config.cache.expiry()));
    let remote = match Tool::YtDlp.locate(tools.yt_dlp.as_deref()) {
        Ok(binary) => {
            let retriever = YtDlpRetriever::new(binary)
                .with_cookies(tools.cookies.clone())
                .with_cache(cache.clone())
                .with_audio_bitrate(&config.audio.bitrate);
            Some(Arc::new(retriever) as RetrieverHandle)
        },
        Err(_) => {
            tracing::warn!("yt-dlp not found; remote sources will be dropped");
            None
        },
    };

    Ok(Collaborators {
        retriever: Arc::new(RoutingRetriever::new(Arc::new(DirectoryRetriever), remote)),
        encoder: Arc::new(encoder),
        tags: Arc::new(Id3TagWriter),
        cache,
    })
}
