use crate::error::{ErrorKind, Result};
use crate::event::{MixEvent, MixSummary, Plan, SourceSummary};
use crate::produce::{Outcome, Workspace, produce};
use crate::{Collaborators, MixRequest};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use rotamix_core::{DropReason, Pipeline, Source, Track, plan, select, validate};
use rotamix_media::error::ErrorKind as MediaErrorKind;
use rotamix_media::{Resolved, RetrieveOptions};
use rotamix_output::{CleanupCoordinator, OutputLocation};
use std::path::{Path, PathBuf};

/// Streams [`MixEvent`]s for one run of `request`.
///
/// Origins are retrieved concurrently (up to `retrieve_concurrency`) but
/// reported and planned in argument order. Tracks are produced up to
/// `encode_concurrency` at a time; a failed track surfaces as an `Err` item
/// without terminating the stream, while fatal errors (see
/// [`ErrorKind::is_fatal`]) end it.
///
/// All intermediates live in a scratch directory that is removed when the
/// stream finishes, fails, or is dropped part-way.
pub fn mix<'a>(request: &'a MixRequest, collaborators: &'a Collaborators) -> impl Stream<Item = Result<MixEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(MixEvent::Started { origins: request.origins.len(), dry_run: request.dry_run });

        if let Some(cache) = &collaborators.cache {
            match cache.sweep().await {
                Ok(removed) => {
                    yield Ok(MixEvent::CacheSwept(removed));
                },
                Err(e) => tracing::warn!(dir = %cache.dir().display(), error = %&*e, "Could not sweep download cache"),
            }
        }

        let cleanup = CleanupCoordinator::new();
        let scratch = match scratch_dir() {
            Ok(scratch) => scratch,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        cleanup.register(&scratch);

        // Retrieval and validation.
        let resolved = retrieve_all(request, collaborators, &scratch).await;
        let mut reports = Vec::with_capacity(resolved.len());
        let mut sources = Vec::with_capacity(resolved.len());
        for (position, result) in resolved.into_iter().enumerate() {
            let index = position + 1;
            let origin = request.origins[position].clone();
            match result {
                Ok(resolved) => sources.push(
                    Source::new(index, origin, resolved.items)
                        .with_skipped(resolved.skipped)
                        .with_cached(resolved.cached),
                ),
                Err(reason) => {
                    tracing::warn!(source = index, origin = %origin, %reason, "Dropping source");
                    reports.push((index, MixEvent::SourceDropped { index, origin, reason }));
                },
            }
        }
        let validation = validate(sources);
        for (source, reason) in validation.dropped {
            let (index, origin) = (source.index(), source.origin().clone());
            reports.push((index, MixEvent::SourceDropped { index, origin, reason }));
        }
        for source in &validation.valid {
            reports.push((source.index(), MixEvent::SourceResolved(SourceSummary::from(source))));
        }
        reports.sort_by_key(|(index, _)| *index);
        for (_, report) in reports {
            yield Ok(report);
        }

        // Planning.
        let selection = select(&validation.valid, request.video);
        let mut audio = match plan(&selection.audio) {
            Ok(plan) => plan.tracks(Pipeline::Audio),
            Err(e) => {
                yield Err(e.raise(ErrorKind::AllSourcesExhausted));
                cleanup.abort();
                return;
            },
        };
        // No video-eligible source simply means no video tracks.
        let mut video = plan(&selection.video).map(|plan| plan.tracks(Pipeline::Video)).unwrap_or_default();
        let summary_plan = Plan {
            audio_sources: selection.audio.len(),
            audio_tracks: audio.len(),
            video_sources: selection.video.len(),
            video_tracks: video.len(),
        };
        tracing::info!(
            audio_tracks = summary_plan.audio_tracks,
            video_tracks = summary_plan.video_tracks,
            "Rotation planned"
        );
        yield Ok(MixEvent::Planned(summary_plan));
        let mut summary = MixSummary { plan: summary_plan, ..MixSummary::default() };

        if request.dry_run {
            for track in audio.iter().chain(&video) {
                yield Ok(preview(track, track_total(track, &summary_plan)));
            }
            summary.cleaned = cleanup.commit().removed;
            yield Ok(MixEvent::Complete(summary));
            return;
        }

        // Production.
        let location = OutputLocation::resolve(&request.output_dir, &request.album);
        let location = match location.or_raise(|| ErrorKind::OutputLocation) {
            Ok(location) => location,
            Err(e) => {
                yield Err(e);
                cleanup.abort();
                return;
            },
        };
        tracing::info!(dir = %location.dir().display(), "Output directory resolved");
        yield Ok(MixEvent::OutputResolved(location.dir().to_path_buf()));
        for track in audio.iter_mut().chain(video.iter_mut()) {
            let total = track_total(track, &summary_plan);
            track.assign_output(location.track_path(track.index(), total, track.pipeline().extension()));
        }

        let workspace = Workspace { request, collaborators, location: &location, cleanup: &cleanup, scratch: &scratch };
        let workspace = &workspace;
        let mut futures: Vec<_> = audio
            .iter()
            .chain(&video)
            .map(|track| async move {
                let total = track_total(track, &summary_plan);
                (track, total, produce(track, total, workspace).await)
            })
            .collect();
        let mut processing = FuturesUnordered::new();
        processing.extend(futures.drain(..request.encode_concurrency.max(1).min(futures.len())));
        while let Some((track, total, result)) = processing.next().await {
            let (pipeline, index) = (track.pipeline(), track.index());
            match result {
                Ok(Outcome::Created(path)) => {
                    match pipeline {
                        Pipeline::Audio => summary.audio_created += 1,
                        Pipeline::Video => summary.video_created += 1,
                    }
                    yield Ok(MixEvent::TrackCreated { pipeline, index, total, path });
                },
                Ok(Outcome::Skipped) => {
                    yield Ok(MixEvent::TrackSkipped { pipeline, index, total });
                },
                Err(e) => {
                    tracing::warn!(%pipeline, track = index, error = %&*e, "Track failed");
                    yield Err(e);
                },
            }
            // Pop-n-push, but FIFO instead of LIFO.
            if !futures.is_empty() {
                processing.push(futures.remove(0));
            }
        }
        // Release the borrows of `cleanup` before committing it.
        drop(processing);
        drop(futures);

        summary.output_dir = Some(location.dir().to_path_buf());
        summary.cleaned = cleanup.commit().removed;
        yield Ok(MixEvent::Complete(summary));
    })
}

fn track_total(track: &Track, plan: &Plan) -> usize {
    match track.pipeline() {
        Pipeline::Audio => plan.audio_tracks,
        Pipeline::Video => plan.video_tracks,
    }
}

fn preview(track: &Track, total: usize) -> MixEvent {
    let metadata = track.metadata();
    MixEvent::TrackPreview {
        pipeline: track.pipeline(),
        index: track.index(),
        total,
        title: metadata.map(|m| m.title.clone()),
        artist: metadata.map(|m| m.artist.clone()),
    }
}

fn drop_reason(err: &MediaErrorKind) -> DropReason {
    match err {
        MediaErrorKind::Unresolvable(reason) => DropReason::Unresolvable(reason.clone()),
        other => DropReason::Unresolvable(other.to_string()),
    }
}

fn scratch_dir() -> Result<PathBuf> {
    let dir = tempfile::Builder::new().prefix("rotamix-").tempdir().or_raise(|| ErrorKind::Scratch)?;
    let path = dir.keep();
    tracing::debug!(scratch = %path.display(), "Scratch directory created");
    Ok(path)
}

/// Resolves every origin, at most `retrieve_concurrency` at a time, and
/// returns the outcomes in argument order regardless of completion order.
async fn retrieve_all(
    request: &MixRequest,
    collaborators: &Collaborators,
    scratch: &Path,
) -> Vec<std::result::Result<Resolved, DropReason>> {
    let options = RetrieveOptions { recursive: request.recursive, video: request.video, list_only: request.dry_run };
    let options = &options;
    let mut futures: Vec<_> = request
        .origins
        .iter()
        .enumerate()
        .map(|(position, origin)| async move {
            let dir = scratch.join(format!("source_{}", position + 1));
            let result = collaborators.retriever.resolve(origin, options, &dir).await;
            (position, result.map_err(|e| drop_reason(&e)))
        })
        .collect();
    let mut results: Vec<_> = (0..futures.len()).map(|_| Err(DropReason::NoItemsResolved)).collect();
    let mut processing = FuturesUnordered::new();
    processing.extend(futures.drain(..request.retrieve_concurrency.max(1).min(futures.len())));
    while let Some((position, result)) = processing.next().await {
        results[position] = result;
        if !futures.is_empty() {
            processing.push(futures.remove(0));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MixSummary, Plan};
    use rotamix_core::{MediaItem, Origin};
    use rotamix_media::mock::{MockEncoder, MockRetriever, MockTagWriter};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        retriever: Arc<MockRetriever>,
        encoder: Arc<MockEncoder>,
        tags: Arc<MockTagWriter>,
        out: TempDir,
    }
    impl Fixture {
        fn new(retriever: MockRetriever) -> Self {
            Self::with_encoder(retriever, MockEncoder::new())
        }

        fn with_encoder(retriever: MockRetriever, encoder: MockEncoder) -> Self {
            Self {
                retriever: Arc::new(retriever),
                encoder: Arc::new(encoder),
                tags: Arc::new(MockTagWriter::new()),
                out: TempDir::new().unwrap(),
            }
        }

        fn collaborators(&self) -> Collaborators {
            Collaborators {
                retriever: self.retriever.clone(),
                encoder: self.encoder.clone(),
                tags: self.tags.clone(),
                cache: None,
            }
        }

        fn request(&self, origins: &[&str], album: &str) -> MixRequest {
            MixRequest::new(origins.iter().map(|o| Origin::new(*o)), album, self.out.path())
        }

        async fn run(&self, request: &MixRequest) -> Vec<Result<MixEvent>> {
            let collaborators = self.collaborators();
            mix(request, &collaborators).collect().await
        }
    }

    fn summary(events: &[Result<MixEvent>]) -> Option<&MixSummary> {
        events.iter().find_map(|event| match event {
            Ok(MixEvent::Complete(summary)) => Some(summary),
            _ => None,
        })
    }

    fn errors(events: &[Result<MixEvent>]) -> Vec<ErrorKind> {
        events.iter().filter_map(|event| event.as_ref().err()).map(|e| (**e).clone()).collect()
    }

    /// The run's scratch root; retrievers get one subdirectory per origin.
    fn scratch_root(retriever: &MockRetriever) -> PathBuf {
        let dirs = retriever.scratch_dirs();
        dirs[0].parent().unwrap().to_path_buf()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_rotates_tags_and_cleans_up() {
        let retriever = MockRetriever::new().with_downloads("a", &["a1", "a2", "a3"], false).with_downloads(
            "b",
            &["b1"],
            false,
        );
        let fixture = Fixture::new(retriever);
        let request = fixture.request(&["a", "b"], "Road Trip");
        let events = fixture.run(&request).await;

        assert!(errors(&events).is_empty());
        let summary = summary(&events).unwrap();
        assert_eq!(summary.audio_created, 3);
        assert_eq!(summary.video_created, 0);
        assert_eq!(summary.plan, Plan { audio_sources: 2, audio_tracks: 3, video_sources: 0, video_tracks: 0 });
        let dir = fixture.out.path().join("Road Trip");
        assert_eq!(summary.output_dir.as_deref(), Some(dir.as_path()));
        assert_eq!(file_names(&dir), ["track-01.mp3", "track-02.mp3", "track-03.mp3"]);
        // The single-item source is reused on every track.
        assert_eq!(std::fs::read_to_string(dir.join("track-02.mp3")).unwrap(), "a2b1");
        assert_eq!(std::fs::read_to_string(dir.join("track-03.mp3")).unwrap(), "a3b1");

        let mut tags = fixture.tags.calls();
        tags.sort_by_key(|call| call.metadata.number);
        assert_eq!(tags.len(), 3);
        assert!(tags.iter().all(|call| call.album == "Road Trip"));
        assert_eq!(tags[0].metadata.title, "a1 • b1");
        assert_eq!(tags[2].metadata.position(), "3/3");

        // Downloads lived in the scratch directory, which is gone.
        for call in fixture.encoder.calls() {
            assert!(call.inputs.iter().all(|input| !input.exists()));
        }
    }

    #[tokio::test]
    async fn test_source_order_survives_out_of_order_retrieval() {
        let retriever = MockRetriever::new()
            .with_downloads("slow", &["s1"], false)
            .with_delay("slow", Duration::from_millis(50))
            .with_downloads("fast", &["f1"], false);
        let fixture = Fixture::new(retriever);
        let request = fixture.request(&["slow", "fast"], "Order");
        let events = fixture.run(&request).await;

        let resolved: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Ok(MixEvent::SourceResolved(source)) => Some((source.index, source.origin.to_string())),
                _ => None,
            })
            .collect();
        assert_eq!(resolved, [(1, "slow".to_string()), (2, "fast".to_string())]);
        assert_eq!(fixture.tags.calls()[0].metadata.title, "s1 • f1");
    }

    #[tokio::test]
    async fn test_drops_unresolvable_and_empty_sources() {
        let retriever = MockRetriever::new()
            .with_downloads("good", &["g1", "g2"], false)
            .with_skipped("empty", 3)
            .with_failure("broken", "playlist is private");
        let fixture = Fixture::new(retriever);
        let request = fixture.request(&["good", "missing", "empty", "broken"], "Drops");
        let events = fixture.run(&request).await;

        let dropped: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Ok(MixEvent::SourceDropped { index, reason, .. }) => Some((*index, reason.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(dropped.len(), 3);
        assert_eq!(dropped[0].0, 2);
        assert!(matches!(dropped[0].1, DropReason::Unresolvable(_)));
        assert_eq!(dropped[1], (3, DropReason::NoItemsResolved));
        assert_eq!(dropped[2].0, 4);
        assert!(dropped[2].1.to_string().contains("playlist is private"));
        assert_eq!(summary(&events).unwrap().audio_created, 2);
    }

    #[tokio::test]
    async fn test_no_audio_sources_is_fatal() {
        let scratch = TempDir::new().unwrap();
        let video = scratch.path().join("clip.mp4");
        std::fs::write(&video, b"clip").unwrap();
        let retriever = MockRetriever::new().with_items("clips", [MediaItem::video(video)]);
        let fixture = Fixture::new(retriever);
        let mut request = fixture.request(&["missing", "clips"], "Nothing");
        request.video = true;
        let events = fixture.run(&request).await;

        assert!(summary(&events).is_none());
        assert_eq!(errors(&events), [ErrorKind::AllSourcesExhausted]);
        assert!(matches!(events.last(), Some(Err(_))));
        assert!(file_names(fixture.out.path()).is_empty());
        assert!(fixture.encoder.calls().is_empty());
        assert!(!scratch_root(&fixture.retriever).exists());
    }

    #[tokio::test]
    async fn test_dropping_the_stream_removes_intermediates() {
        let fixture = Fixture::new(MockRetriever::new().with_downloads("a", &["a1", "a2"], false));
        let request = fixture.request(&["a"], "Cancelled");
        let collaborators = fixture.collaborators();
        let mut events = Box::pin(mix(&request, &collaborators));
        while let Some(event) = events.next().await {
            if matches!(event, Ok(MixEvent::OutputResolved(_))) {
                break;
            }
        }
        let scratch = scratch_root(&fixture.retriever);
        assert!(scratch.join("source_1").join("a1.mp3").exists());

        drop(events);
        assert!(!scratch.exists());
        assert!(file_names(&fixture.out.path().join("Cancelled")).is_empty());
        assert!(fixture.encoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_previews_without_writing() {
        let retriever =
            MockRetriever::new().with_downloads("a", &["a1", "a2"], false).with_downloads("b", &["b1"], false);
        let fixture = Fixture::new(retriever);
        let mut request = fixture.request(&["a", "b"], "Preview");
        request.dry_run = true;
        let events = fixture.run(&request).await;

        let previews: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Ok(MixEvent::TrackPreview { index, total, title, .. }) => Some((*index, *total, title.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(previews, [(1, 2, Some("a1 • b1".to_string())), (2, 2, Some("a2 • b1".to_string()))]);
        assert_eq!(summary(&events).unwrap().output_dir, None);
        assert!(file_names(fixture.out.path()).is_empty());
        assert!(fixture.encoder.calls().is_empty());
        assert!(fixture.tags.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_track_does_not_stop_the_run() {
        let retriever = MockRetriever::new().with_downloads("a", &["a1", "a2", "a3"], false);
        let fixture = Fixture::with_encoder(retriever, MockEncoder::new().failing_on("track-02.mp3"));
        let request = fixture.request(&["a"], "Partial");
        let events = fixture.run(&request).await;

        assert_eq!(errors(&events), [ErrorKind::Encode { pipeline: Pipeline::Audio, track: 2 }]);
        assert_eq!(summary(&events).unwrap().audio_created, 2);
        // The half-written track was removed with the other intermediates.
        let dir = fixture.out.path().join("Partial");
        assert_eq!(file_names(&dir), ["track-01.mp3", "track-03.mp3"]);
    }

    #[tokio::test]
    async fn test_pipelines_plan_independently() {
        let retriever = MockRetriever::new()
            .with_downloads("a", &["a1", "a2", "a3"], false)
            .with_downloads("b", &["b1", "b2"], true);
        let fixture = Fixture::new(retriever);
        let mut request = fixture.request(&["a", "b"], "Both");
        request.video = true;
        let events = fixture.run(&request).await;

        let summary = summary(&events).unwrap();
        assert_eq!(summary.plan, Plan { audio_sources: 2, audio_tracks: 3, video_sources: 1, video_tracks: 2 });
        assert_eq!((summary.audio_created, summary.video_created), (3, 2));
        let dir = fixture.out.path().join("Both");
        assert_eq!(
            file_names(&dir),
            ["track-01.mp3", "track-01.mp4", "track-02.mp3", "track-02.mp4", "track-03.mp3"]
        );
        assert_eq!(std::fs::read_to_string(dir.join("track-02.mp4")).unwrap(), "b2");
        // Only audio tracks are tagged.
        assert_eq!(fixture.tags.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_track_without_contributors_is_skipped() {
        let media = TempDir::new().unwrap();
        let write = |name: &str| {
            let path = media.path().join(name);
            std::fs::write(&path, name).unwrap();
            path
        };
        let items = [MediaItem::audiovisual(write("x1.mp3"), write("x1.mp4")), MediaItem::audio(write("x2.mp3"))];
        let fixture = Fixture::new(MockRetriever::new().with_items("mixed", items));
        let mut request = fixture.request(&["mixed"], "Gaps");
        request.video = true;
        let events = fixture.run(&request).await;

        assert!(events.iter().any(|event| matches!(
            event,
            Ok(MixEvent::TrackSkipped { pipeline: Pipeline::Video, index: 2, total: 2 })
        )));
        let summary = summary(&events).unwrap();
        assert_eq!((summary.audio_created, summary.video_created), (2, 1));
        let dir = fixture.out.path().join("Gaps");
        assert_eq!(file_names(&dir), ["track-01.mp3", "track-01.mp4", "track-02.mp3"]);
    }

    #[tokio::test]
    async fn test_unusable_output_directory_is_fatal() {
        let fixture = Fixture::new(MockRetriever::new().with_downloads("a", &["a1"], false));
        let blocker = fixture.out.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut request = fixture.request(&["a"], "Blocked");
        request.output_dir = blocker;
        let events = fixture.run(&request).await;

        assert_eq!(errors(&events), [ErrorKind::OutputLocation]);
        assert!(summary(&events).is_none());
        assert!(fixture.encoder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_runs_get_versioned_directories() {
        let fixture = Fixture::new(MockRetriever::new().with_downloads("a", &["a1"], false));
        let request = fixture.request(&["a"], "Again");
        let first = fixture.run(&request).await;
        let second = fixture.run(&request).await;

        let first = summary(&first).unwrap().output_dir.clone().unwrap();
        let second = summary(&second).unwrap().output_dir.clone().unwrap();
        assert_eq!(first, fixture.out.path().join("Again"));
        assert_eq!(second, fixture.out.path().join("Again.1"));
        assert!(second.join("track-01.mp3").exists());
    }

    #[tokio::test]
    async fn test_event_order() {
        let fixture = Fixture::new(MockRetriever::new().with_downloads("a", &["a1"], false));
        let request = fixture.request(&["a"], "Order");
        let events = fixture.run(&request).await;

        let kinds: Vec<_> = events
            .iter()
            .map(|event| match event {
                Ok(MixEvent::Started { .. }) => "started",
                Ok(MixEvent::SourceResolved(_)) => "resolved",
                Ok(MixEvent::Planned(_)) => "planned",
                Ok(MixEvent::OutputResolved(_)) => "output",
                Ok(MixEvent::TrackCreated { .. }) => "created",
                Ok(MixEvent::Complete(_)) => "complete",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["started", "resolved", "planned", "output", "created", "complete"]);
    }
}
