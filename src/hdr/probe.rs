//! mediainfo/ffprobe access shared by detection, metadata extraction and
//! verification, with results cached per file for the whole run.

use crate::config::ToolKind;
use crate::utils::ffmpeg::color_transfer_probe_args;
use crate::utils::tool_runner::{CapturedOutput, CommandRunner};
use crate::utils::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

type Track = Map<String, Value>;

#[derive(Debug, Deserialize)]
struct MediaInfoDocument {
    media: Option<MediaSection>,
}

#[derive(Debug, Deserialize)]
struct MediaSection {
    #[serde(default)]
    track: Vec<Track>,
}

/// The General and first Video track of a `mediainfo --Output=JSON` report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfoReport {
    pub general: Option<Track>,
    pub video: Option<Track>,
}

impl MediaInfoReport {
    pub fn from_json(text: &str) -> Result<Self> {
        let document: MediaInfoDocument = serde_json::from_str(text)?;
        let tracks = document.media.map(|m| m.track).unwrap_or_default();

        let first_of = |kind: &str| {
            tracks
                .iter()
                .find(|t| t.get("@type").and_then(Value::as_str) == Some(kind))
                .cloned()
        };

        Ok(Self {
            general: first_of("General"),
            video: first_of("Video"),
        })
    }

    pub fn video_field(&self, key: &str) -> Option<&Value> {
        self.video.as_ref().and_then(|t| t.get(key))
    }

    pub fn video_str(&self, key: &str) -> Option<&str> {
        self.video_field(key).and_then(Value::as_str)
    }

    pub fn general_str(&self, key: &str) -> Option<&str> {
        self.general
            .as_ref()
            .and_then(|t| t.get(key))
            .and_then(Value::as_str)
    }
}

/// Per-run cache of mediainfo reports keyed by canonical path.
///
/// A report is fetched at most once per path; failed probes are cached as
/// `None` so they are not retried.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<PathBuf, Option<Arc<MediaInfoReport>>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    pub fn get(&self, path: &Path) -> Option<Option<Arc<MediaInfoReport>>> {
        let key = Self::key(path);
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&key).cloned())
    }

    pub fn insert(&self, path: &Path, report: Option<Arc<MediaInfoReport>>) {
        let key = Self::key(path);
        if let Ok(mut entries) = self.entries.lock() {
            entries.entry(key).or_insert(report);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MediaProbe<'a, R: CommandRunner> {
    runner: &'a R,
    cache: &'a MetadataCache,
}

impl<'a, R: CommandRunner> MediaProbe<'a, R> {
    pub fn new(runner: &'a R, cache: &'a MetadataCache) -> Self {
        Self { runner, cache }
    }

    /// `mediainfo --Inform=Video;%HDR_Format%/%HDR_Format_Compatibility%`
    pub async fn hdr_format_string(&self, path: &Path) -> Result<CapturedOutput> {
        let args = vec![
            "--Inform=Video;%HDR_Format%/%HDR_Format_Compatibility%".to_string(),
            path.display().to_string(),
        ];
        self.runner.capture(ToolKind::MediaInfo, &args).await
    }

    /// Full mediainfo JSON report, cached per path.
    pub async fn media_info(&self, path: &Path) -> Option<Arc<MediaInfoReport>> {
        if let Some(cached) = self.cache.get(path) {
            return cached;
        }

        let args = vec!["--Output=JSON".to_string(), path.display().to_string()];
        let report = match self.runner.capture(ToolKind::MediaInfo, &args).await {
            Ok(output) if output.success => match MediaInfoReport::from_json(&output.stdout) {
                Ok(report) => Some(Arc::new(report)),
                Err(e) => {
                    warn!("Could not parse mediainfo JSON for {}: {}", path.display(), e);
                    None
                }
            },
            Ok(_) => {
                debug!("mediainfo JSON probe failed for {}", path.display());
                None
            }
            Err(e) => {
                debug!("mediainfo unavailable: {}", e);
                None
            }
        };

        self.cache.insert(path, report.clone());
        report
    }

    /// Lower-cased `color_transfer` of the first video stream, via ffprobe.
    pub async fn color_transfer(&self, path: &Path) -> Option<String> {
        let args = color_transfer_probe_args(path);
        match self.runner.capture(ToolKind::Ffprobe, &args).await {
            Ok(output) if output.success => {
                let value = output.stdout.trim().to_lowercase();
                (!value.is_empty()).then_some(value)
            }
            Ok(_) => None,
            Err(e) => {
                debug!("ffprobe unavailable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tool_runner::fake::FakeRunner;
    use pretty_assertions::assert_eq;

    const REPORT: &str = r#"{
        "media": {
            "@ref": "movie.mkv",
            "track": [
                {"@type": "General", "Duration": "5.005", "FrameRate": "23.976"},
                {"@type": "Video", "FrameCount": "120", "HDR_Format": "SMPTE ST 2086", "MaxCLL": "1000 cd/m2"},
                {"@type": "Audio", "Format": "E-AC-3"}
            ]
        }
    }"#;

    #[test]
    fn test_report_picks_general_and_video_tracks() {
        let report = MediaInfoReport::from_json(REPORT).unwrap();
        assert_eq!(report.video_str("FrameCount"), Some("120"));
        assert_eq!(report.video_str("HDR_Format"), Some("SMPTE ST 2086"));
        assert_eq!(report.general_str("Duration"), Some("5.005"));
        assert_eq!(report.video_str("Format"), None);
    }

    #[test]
    fn test_report_without_media() {
        let report = MediaInfoReport::from_json(r#"{"media": null}"#).unwrap();
        assert_eq!(report, MediaInfoReport::default());
        assert!(MediaInfoReport::from_json("not json").is_err());
    }

    #[tokio::test]
    async fn test_media_info_is_cached_per_path() {
        let runner = FakeRunner::new().with_capture(ToolKind::MediaInfo, "--Output=JSON", REPORT);
        let cache = MetadataCache::new();
        let probe = MediaProbe::new(&runner, &cache);
        let path = Path::new("/media/movie.mkv");

        let first = probe.media_info(path).await;
        let second = probe.media_info(path).await;

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_is_cached_as_none() {
        let runner = FakeRunner::new();
        let cache = MetadataCache::new();
        let probe = MediaProbe::new(&runner, &cache);
        let path = Path::new("/media/broken.mkv");

        assert!(probe.media_info(path).await.is_none());
        assert!(probe.media_info(path).await.is_none());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_color_transfer_is_lowercased() {
        let runner =
            FakeRunner::new().with_capture(ToolKind::Ffprobe, "stream=color_transfer", "ARIB-STD-B67\n");
        let cache = MetadataCache::new();
        let probe = MediaProbe::new(&runner, &cache);

        assert_eq!(
            probe.color_transfer(Path::new("a.mkv")).await.as_deref(),
            Some("arib-std-b67")
        );
    }
}
