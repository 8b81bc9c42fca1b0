//! Producing one planned track.

use crate::error::{ErrorKind, Result};
use crate::{Collaborators, MixRequest};
use exn::ResultExt;
use rotamix_core::{MediaRef, Pipeline, Track};
use rotamix_media::error::{ErrorKind as MediaErrorKind, Result as MediaResult};
use rotamix_output::{CleanupCoordinator, OutputLocation};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub(crate) enum Outcome {
    Created(PathBuf),
    Skipped,
}

/// Everything the tracks of one run share.
pub(crate) struct Workspace<'a> {
    pub request: &'a MixRequest,
    pub collaborators: &'a Collaborators,
    pub location: &'a OutputLocation,
    pub cleanup: &'a CleanupCoordinator,
    pub scratch: &'a Path,
}

/// Encodes into a partial file, tags it (audio only) and renames it into
/// place. Only a track that went through all three steps exists under its
/// final name; the partial file is registered for cleanup before it is
/// written.
#[instrument(skip_all, fields(pipeline = %track.pipeline(), track = track.index()))]
pub(crate) async fn produce(track: &Track, total: usize, ws: &Workspace<'_>) -> Result<Outcome> {
    let pipeline = track.pipeline();
    let index = track.index();
    if !track.has_inputs() {
        tracing::info!("No contributor has this pipeline's content; skipping track");
        return Ok(Outcome::Skipped);
    }
    let failed = || ErrorKind::Encode { pipeline, track: index };

    let inputs = local_inputs(track).or_raise(failed)?;
    let final_path = match track.output() {
        Some(path) => path.to_path_buf(),
        None => ws.location.track_path(index, total, pipeline.extension()),
    };
    let partial = ws.location.partial_path(index, total, pipeline.extension());
    ws.cleanup.register(&partial);

    match pipeline {
        Pipeline::Audio => {
            ws.collaborators.encoder.combine_audio(&inputs, &partial).await.or_raise(failed)?;
            if let Some(metadata) = track.metadata() {
                ws.collaborators.tags.write_tags(&partial, &ws.request.album, metadata).await.or_raise(failed)?;
            }
        },
        Pipeline::Video => {
            let scratch = ws.scratch.join(format!("video-track-{index:02}"));
            ws.collaborators
                .encoder
                .combine_video(&inputs, &ws.request.normalization, &partial, &scratch)
                .await
                .or_raise(failed)?;
        },
    }
    tokio::fs::rename(&partial, &final_path).await.or_raise(failed)?;
    tracing::debug!(path = %final_path.display(), "Track created");
    Ok(Outcome::Created(final_path))
}

/// Remote references only exist in planning-only runs and can never be
/// encoded.
fn local_inputs(track: &Track) -> MediaResult<Vec<PathBuf>> {
    track
        .inputs()
        .into_iter()
        .map(|input| match input {
            MediaRef::Local(path) => Ok(path.clone()),
            MediaRef::Remote(url) => Err(exn::Exn::from(MediaErrorKind::NotLocal(url.clone()))),
        })
        .collect()
}
