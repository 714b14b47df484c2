use crate::config::{HwAccel, OptimizerProfile, ToolKind};
use crate::utils::filesystem::file_stem;
use crate::utils::tool_runner::ToolInvocation;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Plausible mastering peaks for HLG sources.
const HLG_PEAK_RANGE: std::ops::RangeInclusive<u32> = 100..=10000;

/// Options forwarded to the measurement analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerOptions {
    pub optimizer_profile: OptimizerProfile,
    pub hwaccel: HwAccel,
    /// Set for HLG sources; the analyzer then measures in PQ-equivalent nits.
    pub hlg_peak_nits: Option<u32>,
}

/// `<dir>/<stem>_measurements.bin` next to the source.
pub fn measurements_output_path(input: &Path) -> PathBuf {
    let dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}_measurements.bin", file_stem(input)))
}

/// Runs the analyzer in its fast mode (2x downscale, every third frame).
pub fn analyze(input: &Path, output: &Path, options: &AnalyzerOptions) -> ToolInvocation {
    let mut args = vec![
        input.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
        "--downscale".to_string(),
        "2".to_string(),
        "--sample-rate".to_string(),
        "3".to_string(),
    ];

    if let Some(nits) = options.hlg_peak_nits {
        if !HLG_PEAK_RANGE.contains(&nits) {
            warn!("HLG peak of {} nits is outside the usual 100-10000 range", nits);
        }
        args.push("--hlg-peak-nits".to_string());
        args.push(nits.to_string());
    }

    args.push("--optimizer-profile".to_string());
    args.push(options.optimizer_profile.as_str().to_string());

    if options.hwaccel != HwAccel::None {
        args.push("--hwaccel".to_string());
        args.push(options.hwaccel.as_str().to_string());
    }

    ToolInvocation::new(ToolKind::Analyzer, args).mirrored()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_lands_next_to_source() {
        assert_eq!(
            measurements_output_path(Path::new("/media/Movie.mkv")),
            PathBuf::from("/media/Movie_measurements.bin")
        );
        assert_eq!(
            measurements_output_path(Path::new("Movie.mkv")),
            PathBuf::from("./Movie_measurements.bin")
        );
    }

    #[test]
    fn test_pq_analysis_args() {
        let invocation = analyze(
            Path::new("in.mkv"),
            Path::new("in_measurements.bin"),
            &AnalyzerOptions {
                optimizer_profile: OptimizerProfile::Aggressive,
                hwaccel: HwAccel::Cuda,
                hlg_peak_nits: None,
            },
        );
        assert_eq!(
            invocation.args.join(" "),
            "in.mkv -o in_measurements.bin --downscale 2 --sample-rate 3 --optimizer-profile aggressive --hwaccel cuda"
        );
        assert!(invocation.mirror);
    }

    #[test]
    fn test_hlg_analysis_passes_peak() {
        let invocation = analyze(
            Path::new("in.mkv"),
            Path::new("out.bin"),
            &AnalyzerOptions {
                optimizer_profile: OptimizerProfile::Conservative,
                hwaccel: HwAccel::None,
                hlg_peak_nits: Some(1000),
            },
        );
        assert_eq!(invocation.flag_value(&["--hlg-peak-nits"]), Some("1000"));
        assert!(!invocation.args.contains(&"--hwaccel".to_string()));
    }
}
