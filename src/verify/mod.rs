//! Post-mux consistency checks on a finished Dolby Vision file.

use crate::dolby_vision::{DoviTool, RpuSummary};
use crate::hdr::metadata::parse_decimal;
use crate::hdr::probe::{MediaInfoReport, MediaProbe, MetadataCache};
use crate::measurements::{parse_frame_count, verify_measurements};
use crate::utils::tool_runner::{CommandRunner, ToolInvocation, ToolOutcome};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{error, info, warn};

/// Where a frame count was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    Measurements,
    Container,
    Rpu,
}

impl fmt::Display for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Measurements => "measurements",
            Self::Container => "container",
            Self::Rpu => "RPU",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCountMismatch {
    pub first: (FrameSource, u64),
    pub second: (FrameSource, u64),
}

impl fmt::Display for FrameCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames ({}) != {} frames ({})",
            self.first.0, self.first.1, self.second.0, self.second.1
        )
    }
}

/// Every disagreeing pair among the counts that are present.
pub fn frame_count_mismatches(counts: &[(FrameSource, Option<u64>)]) -> Vec<FrameCountMismatch> {
    let present: Vec<(FrameSource, u64)> = counts
        .iter()
        .filter_map(|(source, count)| count.map(|c| (*source, c)))
        .collect();

    let mut mismatches = Vec::new();
    for (i, first) in present.iter().enumerate() {
        for second in &present[i + 1..] {
            if first.1 != second.1 {
                mismatches.push(FrameCountMismatch {
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    mismatches
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// `FrameCount` of the video track, else duration (seconds) times frame rate.
pub fn container_frame_count(report: &MediaInfoReport) -> Option<u64> {
    if let Some(count) = report.video_field("FrameCount").and_then(number) {
        return Some(count.round() as u64);
    }

    let field = |key: &str| {
        report
            .video_field(key)
            .and_then(number)
            .or_else(|| report.general.as_ref().and_then(|t| t.get(key)).and_then(number))
    };
    let duration = field("Duration")?;
    let rate = field("FrameRate")?;
    let frames = (duration * rate).round();
    (frames > 0.0).then_some(frames as u64)
}

/// Whether mediainfo's HDR format or its compatibility field names Dolby Vision.
pub fn is_dolby_vision_tagged(report: &MediaInfoReport) -> bool {
    ["HDR_Format", "HDR_Format_Compatibility"]
        .iter()
        .filter_map(|key| report.video_str(key))
        .any(|value| value.to_lowercase().contains("dolby vision"))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub measurement_frames: Option<u64>,
    pub container_frames: Option<u64>,
    pub rpu_frames: Option<u64>,
    pub rpu_profile: Option<String>,
    pub dolby_vision_tagged: bool,
    pub mismatches: Vec<FrameCountMismatch>,
    pub tool_failures: Vec<String>,
    pub warnings: Vec<String>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.tool_failures.is_empty()
    }

    fn check_frame_counts(&mut self) {
        self.mismatches = frame_count_mismatches(&[
            (FrameSource::Measurements, self.measurement_frames),
            (FrameSource::Container, self.container_frames),
            (FrameSource::Rpu, self.rpu_frames),
        ]);
    }

    fn log(&self) {
        for mismatch in &self.mismatches {
            error!("Frame count mismatch: {}", mismatch);
        }
        for failure in &self.tool_failures {
            error!("Verification step failed: {}", failure);
        }
        for warning in &self.warnings {
            warn!("{}", warning);
        }
        if self.passed() {
            info!("Verification passed");
        } else {
            error!("Verification failed");
        }
    }
}

/// Cross-checks the muxed output against its RPU and the measurements it was
/// generated from. Every check runs; problems end up in the report.
pub struct PostMuxVerifier<'a, R: CommandRunner> {
    runner: &'a R,
    probe: MediaProbe<'a, R>,
}

impl<'a, R: CommandRunner> PostMuxVerifier<'a, R> {
    pub fn new(runner: &'a R, cache: &'a MetadataCache) -> Self {
        Self {
            runner,
            probe: MediaProbe::new(runner, cache),
        }
    }

    async fn step(&self, invocation: &ToolInvocation, log: &Path) -> Option<ToolOutcome> {
        match self.runner.run(invocation, log).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    pub async fn verify(
        &self,
        output: &Path,
        measurements: Option<&Path>,
        temp_dir: &Path,
    ) -> VerificationReport {
        info!("Verifying {}", output.display());
        let mut report = VerificationReport::default();

        if let Some(measurements) = measurements {
            let log = temp_dir.join("verifier.log");
            match self.step(&verify_measurements(measurements), &log).await {
                Some(outcome) if outcome.success => {
                    report.measurement_frames = parse_frame_count(&outcome.log_text());
                }
                Some(_) => report
                    .tool_failures
                    .push(format!("verifier reported issues (see {})", log.display())),
                None => warn!("Verifier not available, skipping measurements check"),
            }
        }

        let rpu = temp_dir.join("RPU_verify.bin");
        let log = temp_dir.join("extract_rpu_verify.log");
        match self.step(&DoviTool::extract_rpu(output, &rpu), &log).await {
            Some(outcome) if outcome.success => {
                let log = temp_dir.join("dovi_info.log");
                match self.step(&DoviTool::info_summary(&rpu), &log).await {
                    Some(outcome) if outcome.success => {
                        let summary = RpuSummary::parse(&outcome.log_text());
                        if !summary.is_profile_8() {
                            report.warnings.push(format!(
                                "RPU profile is {}, expected 8.x",
                                summary.profile.as_deref().unwrap_or("unknown")
                            ));
                        }
                        report.rpu_frames = summary.frames;
                        report.rpu_profile = summary.profile;
                    }
                    _ => report.tool_failures.push("dovi_tool info".to_string()),
                }
            }
            _ => report
                .tool_failures
                .push(format!("dovi_tool extract-rpu (see {})", log.display())),
        }

        match self.probe.media_info(output).await {
            Some(media) => {
                report.container_frames = container_frame_count(&media);
                report.dolby_vision_tagged = is_dolby_vision_tagged(&media);
                if !report.dolby_vision_tagged {
                    report
                        .warnings
                        .push("Output HDR_Format does not mention Dolby Vision".to_string());
                }
            }
            None => report
                .warnings
                .push("Could not read container info of the output".to_string()),
        }

        report.check_frame_counts();
        report.log();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolKind;
    use crate::utils::tool_runner::fake::FakeRunner;
    use pretty_assertions::assert_eq;

    fn output_info(frames: u64) -> String {
        format!(
            r#"{{"media": {{"track": [
                {{"@type": "General", "Duration": "10.010"}},
                {{"@type": "Video", "FrameCount": "{}", "HDR_Format": "Dolby Vision / SMPTE ST 2086"}}
            ]}}}}"#,
            frames
        )
    }

    #[test]
    fn test_one_off_count_is_reported_per_pair() {
        let mismatches = frame_count_mismatches(&[
            (FrameSource::Measurements, Some(240)),
            (FrameSource::Container, Some(241)),
            (FrameSource::Rpu, Some(240)),
        ]);
        assert_eq!(
            mismatches,
            vec![
                FrameCountMismatch {
                    first: (FrameSource::Measurements, 240),
                    second: (FrameSource::Container, 241),
                },
                FrameCountMismatch {
                    first: (FrameSource::Container, 241),
                    second: (FrameSource::Rpu, 240),
                },
            ]
        );
    }

    #[test]
    fn test_absent_counts_are_not_compared() {
        assert!(frame_count_mismatches(&[
            (FrameSource::Measurements, None),
            (FrameSource::Container, Some(100)),
            (FrameSource::Rpu, Some(100)),
        ])
        .is_empty());
    }

    #[test]
    fn test_container_count_from_duration_and_rate() {
        let report = MediaInfoReport::from_json(
            r#"{"media": {"track": [
                {"@type": "General", "Duration": "10.010"},
                {"@type": "Video", "FrameRate": "23.976"}
            ]}}"#,
        )
        .unwrap();
        assert_eq!(container_frame_count(&report), Some(240));
    }

    #[test]
    fn test_dolby_vision_tag_in_compatibility_field() {
        let report = MediaInfoReport::from_json(
            r#"{"media": {"track": [
                {"@type": "Video", "HDR_Format": "SMPTE ST 2086", "HDR_Format_Compatibility": "Dolby Vision / HDR10"}
            ]}}"#,
        )
        .unwrap();
        assert!(is_dolby_vision_tagged(&report));

        let plain = MediaInfoReport::from_json(
            r#"{"media": {"track": [
                {"@type": "Video", "HDR_Format": "SMPTE ST 2086", "HDR_Format_Compatibility": "HDR10"}
            ]}}"#,
        )
        .unwrap();
        assert!(!is_dolby_vision_tagged(&plain));
    }

    #[tokio::test]
    async fn test_mismatched_counts_fail_verification() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Movie.DV.mkv");
        let measurements = dir.path().join("Movie_measurements.bin");
        let runner = FakeRunner::new()
            .with_log(ToolKind::Verifier, "measurements", "Frame count: 240\n")
            .with_log(ToolKind::DoviTool, "--summary", "Summary:\n  Frames: 240\n  Profile: 8.1\n")
            .with_capture(ToolKind::MediaInfo, "--Output=JSON", &output_info(241));
        let cache = MetadataCache::new();

        let report = PostMuxVerifier::new(&runner, &cache)
            .verify(&output, Some(&measurements), dir.path())
            .await;

        assert_eq!(report.measurement_frames, Some(240));
        assert_eq!(report.container_frames, Some(241));
        assert_eq!(report.rpu_frames, Some(240));
        assert_eq!(report.mismatches.len(), 2);
        assert!(report.dolby_vision_tagged);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_consistent_output_passes() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Movie.DV.mkv");
        let runner = FakeRunner::new()
            .with_log(ToolKind::DoviTool, "--summary", "Frames: 240\nProfile: 8.1\n")
            .with_capture(ToolKind::MediaInfo, "--Output=JSON", &output_info(240));
        let cache = MetadataCache::new();

        let report = PostMuxVerifier::new(&runner, &cache)
            .verify(&output, None, dir.path())
            .await;

        assert!(report.passed());
        assert!(report.warnings.is_empty());
        assert_eq!(report.rpu_profile.as_deref(), Some("8.1"));
    }

    #[tokio::test]
    async fn test_wrong_profile_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Movie.DV.mkv");
        let runner = FakeRunner::new()
            .with_log(ToolKind::DoviTool, "--summary", "Frames: 240\nProfile: 7\n")
            .with_capture(ToolKind::MediaInfo, "--Output=JSON", &output_info(240));
        let cache = MetadataCache::new();

        let report = PostMuxVerifier::new(&runner, &cache)
            .verify(&output, None, dir.path())
            .await;

        assert!(report.passed());
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_rpu_extraction_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Movie.DV.mkv");
        let runner = FakeRunner::new()
            .with_failure(ToolKind::DoviTool, "extract-rpu", "Error: no RPU found")
            .with_capture(ToolKind::MediaInfo, "--Output=JSON", &output_info(240));
        let cache = MetadataCache::new();

        let report = PostMuxVerifier::new(&runner, &cache)
            .verify(&output, None, dir.path())
            .await;

        assert!(!report.passed());
        assert_eq!(report.tool_failures.len(), 1);
        assert_eq!(report.rpu_frames, None);
    }
}
