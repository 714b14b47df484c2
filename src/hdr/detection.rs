use super::probe::{MediaProbe, MetadataCache};
use super::types::{Classification, DetectionTier, HdrSignal, HdrVariant};
use crate::utils::filesystem::find_measurements_file;
use crate::utils::tool_runner::CommandRunner;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Tiers in the order they are consulted; the first one yielding a signal wins.
const DETECTION_ORDER: [DetectionTier; 3] = [
    DetectionTier::FormatString,
    DetectionTier::TrackFields,
    DetectionTier::ColorTransfer,
];

/// Signal from the compact `HDR_Format/HDR_Format_Compatibility` string.
pub fn signal_from_format_string(format_info: &str) -> Option<HdrSignal> {
    if format_info.contains("SMPTE ST 2094 App 4") || format_info.contains("HDR10+") {
        Some(HdrSignal::Hdr10Plus)
    } else if format_info.contains("HLG") {
        Some(HdrSignal::Hlg)
    } else if format_info.contains("HDR10")
        || format_info.contains("PQ")
        || format_info.contains("ST 2084")
    {
        Some(HdrSignal::Pq)
    } else {
        None
    }
}

/// Signal from a mediainfo JSON video track.
///
/// Explicit HDR format fields are checked first; failing that, any string
/// field carrying a transfer-function name is taken as a weaker hint.
pub fn signal_from_track(track: &Map<String, Value>) -> Option<HdrSignal> {
    let field = |key: &str| {
        track
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase()
    };
    let combined = format!("{} {}", field("HDR_Format"), field("HDR_Format_Compatibility"));

    if combined.contains("2094") || combined.contains("HDR10+") || combined.contains("HDR10 PLUS") {
        return Some(HdrSignal::Hdr10Plus);
    }
    if combined.contains("HLG") {
        return Some(HdrSignal::Hlg);
    }
    if combined.contains("HDR10") {
        return Some(HdrSignal::Pq);
    }

    track.values().filter_map(Value::as_str).find_map(|value| {
        let value = value.to_uppercase();
        if (value.contains("ARIB") && value.contains("B67")) || value.contains("HLG") {
            Some(HdrSignal::Hlg)
        } else if (value.contains("SMPTE") && value.contains("2084"))
            || value.split(|c: char| !c.is_ascii_alphanumeric()).any(|t| t == "PQ")
        {
            Some(HdrSignal::Pq)
        } else {
            None
        }
    })
}

/// Signal from ffprobe's `color_transfer` value.
pub fn signal_from_color_transfer(transfer: &str) -> Option<HdrSignal> {
    match transfer.trim().to_lowercase().as_str() {
        "arib-std-b67" | "hlg" => Some(HdrSignal::Hlg),
        "smpte2084" | "pq" => Some(HdrSignal::Pq),
        _ => None,
    }
}

/// Decides the HDR variant of a file from mediainfo and ffprobe output.
pub struct FormatClassifier<'a, R: CommandRunner> {
    probe: MediaProbe<'a, R>,
}

impl<'a, R: CommandRunner> FormatClassifier<'a, R> {
    pub fn new(runner: &'a R, cache: &'a MetadataCache) -> Self {
        Self {
            probe: MediaProbe::new(runner, cache),
        }
    }

    pub async fn classify(&self, path: &Path) -> Classification {
        let (raw_probe, format_string) = match self.probe.hdr_format_string(path).await {
            Ok(output) if output.success => {
                let trimmed = output.stdout.trim().to_string();
                (trimmed.clone(), Some(trimmed))
            }
            Ok(_) => {
                error!("mediainfo failed while reading the HDR format of {}", path.display());
                return Classification {
                    variant: HdrVariant::Unsupported,
                    tier: None,
                    measurements: None,
                    raw_probe: String::new(),
                    probe_error: Some("mediainfo exited with an error".to_string()),
                };
            }
            Err(e) => {
                debug!("Compact HDR probe unavailable: {}", e);
                (String::new(), None)
            }
        };

        for tier in DETECTION_ORDER {
            let signal = match tier {
                DetectionTier::FormatString => {
                    format_string.as_deref().and_then(signal_from_format_string)
                }
                DetectionTier::TrackFields => self
                    .probe
                    .media_info(path)
                    .await
                    .and_then(|report| report.video.as_ref().and_then(signal_from_track)),
                DetectionTier::ColorTransfer => self
                    .probe
                    .color_transfer(path)
                    .await
                    .as_deref()
                    .and_then(signal_from_color_transfer),
            };

            let Some(signal) = signal else {
                debug!("No HDR signal from {}", tier);
                continue;
            };

            let measurements = match signal {
                HdrSignal::Pq => find_measurements_file(path),
                _ => None,
            };
            let variant = signal.resolve(measurements.is_some());
            info!("Detected {} via {}", variant, tier);

            return Classification {
                variant,
                tier: Some(tier),
                measurements,
                raw_probe,
                probe_error: None,
            };
        }

        warn!(
            "Unsupported HDR format: {}",
            if raw_probe.is_empty() { "/" } else { raw_probe.as_str() }
        );
        Classification {
            variant: HdrVariant::Unsupported,
            tier: None,
            measurements: None,
            raw_probe,
            probe_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolKind;
    use crate::utils::tool_runner::fake::FakeRunner;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn track(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_hdr10_plus_marker_takes_precedence() {
        for probe in [
            "SMPTE ST 2094 App 4 / HDR10",
            "HDR10 / HDR10+ Profile B",
            "SMPTE ST 2086 / HDR10, HDR10+ Profile A, HLG",
            "PQ / ST 2084 / SMPTE ST 2094 App 4",
        ] {
            assert_eq!(signal_from_format_string(probe), Some(HdrSignal::Hdr10Plus), "{}", probe);
        }
    }

    #[test]
    fn test_format_string_hlg_and_pq() {
        assert_eq!(signal_from_format_string("HLG / "), Some(HdrSignal::Hlg));
        assert_eq!(
            signal_from_format_string("SMPTE ST 2086 / HDR10"),
            Some(HdrSignal::Pq)
        );
        assert_eq!(signal_from_format_string("ST 2084"), Some(HdrSignal::Pq));
        assert_eq!(signal_from_format_string("/"), None);
        assert_eq!(signal_from_format_string(""), None);
    }

    #[test]
    fn test_track_explicit_fields() {
        let plus = track(json!({"HDR_Format": "SMPTE ST 2094 App 4", "HDR_Format_Compatibility": "HDR10+ Profile B"}));
        assert_eq!(signal_from_track(&plus), Some(HdrSignal::Hdr10Plus));

        let hdr10 = track(json!({"HDR_Format": "SMPTE ST 2086", "HDR_Format_Compatibility": "HDR10"}));
        assert_eq!(signal_from_track(&hdr10), Some(HdrSignal::Pq));
    }

    #[test]
    fn test_track_transfer_hints() {
        let hlg = track(json!({"transfer_characteristics": "ARIB STD-B67 (HLG)"}));
        assert_eq!(signal_from_track(&hlg), Some(HdrSignal::Hlg));

        let pq = track(json!({"transfer_characteristics": "SMPTE ST 2084", "BitDepth": 10}));
        assert_eq!(signal_from_track(&pq), Some(HdrSignal::Pq));

        let token = track(json!({"transfer_characteristics_Original": "PQ"}));
        assert_eq!(signal_from_track(&token), Some(HdrSignal::Pq));

        let sdr = track(json!({"transfer_characteristics": "BT.709", "Encoded_Library_Settings": "cpuid=1111039"}));
        assert_eq!(signal_from_track(&sdr), None);
    }

    #[test]
    fn test_color_transfer_mapping() {
        assert_eq!(signal_from_color_transfer("arib-std-b67"), Some(HdrSignal::Hlg));
        assert_eq!(signal_from_color_transfer("SMPTE2084\n"), Some(HdrSignal::Pq));
        assert_eq!(signal_from_color_transfer("bt709"), None);
    }

    fn source_in(dir: &Path) -> std::path::PathBuf {
        let source = dir.join("Movie.mkv");
        std::fs::write(&source, b"x").unwrap();
        source
    }

    #[tokio::test]
    async fn test_hdr10_with_and_without_measurements() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = FakeRunner::new().with_capture(ToolKind::MediaInfo, "--Inform", "HDR10, PQ\n");
        let cache = MetadataCache::new();
        let classifier = FormatClassifier::new(&runner, &cache);

        let result = classifier.classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hdr10Unsupported);
        assert_eq!(result.measurements, None);

        let measurements = dir.path().join("Movie_measurements.bin");
        std::fs::write(&measurements, b"m").unwrap();

        let result = classifier.classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hdr10WithMeasurements);
        assert_eq!(result.tier, Some(DetectionTier::FormatString));
        assert_eq!(result.measurements, Some(measurements));
    }

    #[tokio::test]
    async fn test_falls_through_to_track_fields() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let report = r#"{"media":{"track":[{"@type":"General"},{"@type":"Video","transfer_characteristics":"HLG"}]}}"#;
        let runner = FakeRunner::new()
            .with_capture(ToolKind::MediaInfo, "--Inform", "/\n")
            .with_capture(ToolKind::MediaInfo, "--Output=JSON", report);
        let cache = MetadataCache::new();

        let result = FormatClassifier::new(&runner, &cache).classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hlg);
        assert_eq!(result.tier, Some(DetectionTier::TrackFields));
    }

    #[tokio::test]
    async fn test_track_field_pq_upgraded_by_measurements() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let report = r#"{"media":{"track":[{"@type":"Video","transfer_characteristics":"SMPTE ST 2084"}]}}"#;
        let runner = FakeRunner::new()
            .with_capture(ToolKind::MediaInfo, "--Inform", "/\n")
            .with_capture(ToolKind::MediaInfo, "--Output=JSON", report);
        let cache = MetadataCache::new();
        let classifier = FormatClassifier::new(&runner, &cache);

        let result = classifier.classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hdr10Unsupported);
        assert_eq!(result.tier, Some(DetectionTier::TrackFields));

        let measurements = dir.path().join("Movie.measurements");
        std::fs::write(&measurements, b"m").unwrap();

        let result = classifier.classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hdr10WithMeasurements);
        assert_eq!(result.tier, Some(DetectionTier::TrackFields));
        assert_eq!(result.measurements, Some(measurements));
    }

    #[tokio::test]
    async fn test_color_transfer_pq_upgraded_by_measurements() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let measurements = dir.path().join("measurements.bin");
        std::fs::write(&measurements, b"m").unwrap();
        let runner = FakeRunner::new()
            .without_tool(ToolKind::MediaInfo)
            .with_capture(ToolKind::Ffprobe, "stream=color_transfer", "smpte2084\n");
        let cache = MetadataCache::new();

        let result = FormatClassifier::new(&runner, &cache).classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hdr10WithMeasurements);
        assert_eq!(result.tier, Some(DetectionTier::ColorTransfer));
        assert_eq!(result.measurements, Some(measurements));
    }

    #[tokio::test]
    async fn test_ffprobe_only_installation() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = FakeRunner::new()
            .without_tool(ToolKind::MediaInfo)
            .with_capture(ToolKind::Ffprobe, "stream=color_transfer", "smpte2084\n");
        let cache = MetadataCache::new();

        let result = FormatClassifier::new(&runner, &cache).classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Hdr10Unsupported);
        assert_eq!(result.tier, Some(DetectionTier::ColorTransfer));
        assert_eq!(result.probe_error, None);
    }

    #[tokio::test]
    async fn test_no_signal_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        let runner = FakeRunner::new()
            .with_capture(ToolKind::MediaInfo, "--Inform", "\n")
            .with_capture(ToolKind::Ffprobe, "stream=color_transfer", "bt709\n");
        let cache = MetadataCache::new();

        let result = FormatClassifier::new(&runner, &cache).classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Unsupported);
        assert_eq!(result.tier, None);
        assert_eq!(result.raw_probe, "");
    }

    #[tokio::test]
    async fn test_failing_compact_probe_is_error_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_in(dir.path());
        // No capture rule: mediainfo "runs" and exits non-zero.
        let runner = FakeRunner::new();
        let cache = MetadataCache::new();

        let result = FormatClassifier::new(&runner, &cache).classify(&source).await;
        assert_eq!(result.variant, HdrVariant::Unsupported);
        assert!(result.probe_error.is_some());
        assert_eq!(runner.calls().len(), 1);
    }
}
