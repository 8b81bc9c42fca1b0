//! Human-readable lines for run events, printed to stdout.

use rotamix_core::Pipeline;
use rotamix_mixer::{MixEvent, MixSummary, SourceSummary};
use std::path::Path;

/// The line(s) printed for `event`, if it is worth a line at all.
pub(crate) fn describe(event: &MixEvent) -> Option<String> {
    let line = match event {
        MixEvent::Started { origins, dry_run } => match dry_run {
            true => format!("Planning {origins} source(s) (dry run)"),
            false => format!("Mixing {origins} source(s)"),
        },
        MixEvent::CacheSwept(0) => return None,
        MixEvent::CacheSwept(removed) => {
            format!("Removed {removed} expired cache entr{}", plural(*removed, "y", "ies"))
        },
        MixEvent::SourceResolved(source) => resolved(source),
        MixEvent::SourceDropped { index, origin, reason } => format!("[{index}] Dropped {origin}: {reason}"),
        MixEvent::Planned(plan) => {
            let mut line =
                format!("Planned {} audio track(s) from {} source(s)", plan.audio_tracks, plan.audio_sources);
            if plan.video_sources > 0 {
                line.push_str(&format!(
                    " and {} video track(s) from {} source(s)",
                    plan.video_tracks, plan.video_sources
                ));
            }
            line
        },
        MixEvent::OutputResolved(dir) => format!("Writing to {}", dir.display()),
        MixEvent::TrackPreview { pipeline, index, total, title, artist } => {
            let number = number(*index, *total);
            let title = title.as_deref().filter(|title| !title.is_empty());
            match (pipeline, title, artist) {
                (Pipeline::Audio, Some(title), Some(artist)) => format!("audio {number}/{total}: {title} - {artist}"),
                (Pipeline::Audio, Some(title), None) => format!("audio {number}/{total}: {title}"),
                (Pipeline::Audio, None, Some(artist)) => format!("audio {number}/{total}: untitled - {artist}"),
                (pipeline, _, _) => format!("{pipeline} {number}/{total}"),
            }
        },
        MixEvent::TrackCreated { path, .. } => format!("Created {}", file_name(path)),
        MixEvent::TrackSkipped { pipeline, index, total } => {
            format!("Skipped {pipeline} track {}/{total}: no contributor has {pipeline}", number(*index, *total))
        },
        MixEvent::Complete(summary) => format!("{}\n{}", status(summary), cleaned(summary.cleaned)),
    };
    Some(line)
}

/// The final status line: tracks produced against tracks planned.
pub(crate) fn status(summary: &MixSummary) -> String {
    let plan = &summary.plan;
    let Some(dir) = &summary.output_dir else {
        let mut line = format!("Dry run: {} audio track(s)", plan.audio_tracks);
        if plan.video_sources > 0 {
            line.push_str(&format!(" and {} video track(s)", plan.video_tracks));
        }
        line.push_str(" planned, nothing written");
        return line;
    };
    let mut line = format!("Created {} of {} audio track(s)", summary.audio_created, plan.audio_tracks);
    if plan.video_sources > 0 {
        line.push_str(&format!(" and {} of {} video track(s)", summary.video_created, plan.video_tracks));
    }
    line.push_str(&format!(" in {}", dir.display()));
    line
}

fn resolved(source: &SourceSummary) -> String {
    let mut line = format!(
        "[{}] {} {}: {} audio, {} video item(s)",
        source.index,
        source.origin.describe(),
        source.origin,
        source.audio,
        source.video
    );
    if source.skipped > 0 {
        line.push_str(&format!(", {} skipped", source.skipped));
    }
    if source.cached > 0 {
        line.push_str(&format!(", {} from cache", source.cached));
    }
    line
}

fn cleaned(count: usize) -> String {
    format!("Cleaned up {count} intermediate artifact{}", plural(count, "", "s"))
}

fn number(index: usize, total: usize) -> String {
    let width = total.to_string().len().max(2);
    format!("{index:0width$}")
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    match count {
        1 => one,
        _ => many,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotamix_core::{DropReason, Origin};
    use rotamix_mixer::Plan;
    use rstest::rstest;
    use std::path::PathBuf;

    fn summary(audio: (usize, usize), video: Option<(usize, usize)>, dir: Option<&str>) -> MixSummary {
        MixSummary {
            plan: Plan {
                audio_sources: 2,
                audio_tracks: audio.1,
                video_sources: video.map_or(0, |_| 1),
                video_tracks: video.map_or(0, |v| v.1),
            },
            audio_created: audio.0,
            video_created: video.map_or(0, |v| v.0),
            output_dir: dir.map(PathBuf::from),
            cleaned: 4,
        }
    }

    #[rstest]
    #[case::audio_only(summary((3, 3), None, Some("out/Mix")), "Created 3 of 3 audio track(s) in out/Mix")]
    #[case::with_video(
        summary((2, 3), Some((1, 2)), Some("out/Mix.1")),
        "Created 2 of 3 audio track(s) and 1 of 2 video track(s) in out/Mix.1"
    )]
    #[case::dry_run(summary((0, 5), None, None), "Dry run: 5 audio track(s) planned, nothing written")]
    fn test_status(#[case] summary: MixSummary, #[case] expected: &str) {
        assert_eq!(status(&summary), expected);
    }

    #[test]
    fn test_complete_reports_cleanup() {
        let line = describe(&MixEvent::Complete(summary((1, 1), None, Some("out")))).unwrap();
        assert_eq!(line, "Created 1 of 1 audio track(s) in out\nCleaned up 4 intermediate artifacts");
    }

    #[rstest]
    #[case(MixEvent::CacheSwept(1), Some("Removed 1 expired cache entry"))]
    #[case(MixEvent::CacheSwept(3), Some("Removed 3 expired cache entries"))]
    #[case(MixEvent::CacheSwept(0), None)]
    #[case(
        MixEvent::SourceDropped { index: 2, origin: Origin::new("./gone"), reason: DropReason::NoItemsResolved },
        Some("[2] Dropped ./gone: no items resolved")
    )]
    #[case(
        MixEvent::TrackPreview {
            pipeline: Pipeline::Audio,
            index: 3,
            total: 12,
            title: Some("A • B".into()),
            artist: Some("Various Artists".into()),
        },
        Some("audio 03/12: A • B - Various Artists")
    )]
    #[case(
        MixEvent::TrackPreview {
            pipeline: Pipeline::Audio,
            index: 1,
            total: 5,
            title: Some(String::new()),
            artist: Some("Various Artists".into()),
        },
        Some("audio 01/05: untitled - Various Artists")
    )]
    #[case(
        MixEvent::TrackSkipped { pipeline: Pipeline::Video, index: 4, total: 150 },
        Some("Skipped video track 004/150: no contributor has video")
    )]
    #[case(
        MixEvent::TrackCreated {
            pipeline: Pipeline::Audio,
            index: 1,
            total: 1,
            path: PathBuf::from("out/Mix/track-01.mp3"),
        },
        Some("Created track-01.mp3")
    )]
    fn test_describe(#[case] event: MixEvent, #[case] expected: Option<&str>) {
        assert_eq!(describe(&event).as_deref(), expected);
    }

    #[test]
    fn test_resolved_source_line() {
        let source = SourceSummary {
            index: 1,
            origin: Origin::new("https://youtube.com/playlist?list=PL1"),
            audio: 10,
            video: 0,
            skipped: 2,
            cached: 5,
        };
        assert_eq!(
            describe(&MixEvent::SourceResolved(source)).unwrap(),
            "[1] Remote Playlist https://youtube.com/playlist?list=PL1: \
             10 audio, 0 video item(s), 2 skipped, 5 from cache"
        );
    }
}
