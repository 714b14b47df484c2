use std::path::Path;

use crate::config::{PeakSource, ToolKind};
use crate::utils::tool_runner::ToolInvocation;

fn arg(path: &Path) -> String {
    path.display().to_string()
}

/// Builds `dovi_tool` invocations.
pub struct DoviTool;

impl DoviTool {
    /// RPU from HDR10+ dynamic metadata.
    pub fn generate_from_hdr10plus(
        config: &Path,
        hdr10plus_json: &Path,
        peak_source: PeakSource,
        rpu_out: &Path,
    ) -> ToolInvocation {
        ToolInvocation::new(
            ToolKind::DoviTool,
            [
                "generate".to_string(),
                "-j".to_string(),
                arg(config),
                "--rpu-out".to_string(),
                arg(rpu_out),
                "--hdr10plus-json".to_string(),
                arg(hdr10plus_json),
                "--hdr10plus-peak-source".to_string(),
                peak_source.as_str().to_string(),
            ],
        )
    }

    /// RPU from a madVR measurements file, using the trim targets in `config`.
    pub fn generate_from_measurements(
        config: &Path,
        measurements: &Path,
        rpu_out: &Path,
    ) -> ToolInvocation {
        ToolInvocation::new(
            ToolKind::DoviTool,
            [
                "generate".to_string(),
                "-j".to_string(),
                arg(config),
                "--rpu-out".to_string(),
                arg(rpu_out),
                "--madvr-file".to_string(),
                arg(measurements),
                "--use-custom-targets".to_string(),
            ],
        )
    }

    pub fn inject_rpu(base_layer: &Path, rpu: &Path, output: &Path) -> ToolInvocation {
        ToolInvocation::new(
            ToolKind::DoviTool,
            [
                "inject-rpu".to_string(),
                "-i".to_string(),
                arg(base_layer),
                "--rpu-in".to_string(),
                arg(rpu),
                "-o".to_string(),
                arg(output),
            ],
        )
    }

    pub fn extract_rpu(input: &Path, output: &Path) -> ToolInvocation {
        ToolInvocation::new(
            ToolKind::DoviTool,
            [
                "extract-rpu".to_string(),
                "-i".to_string(),
                arg(input),
                "-o".to_string(),
                arg(output),
            ],
        )
    }

    pub fn info_summary(rpu: &Path) -> ToolInvocation {
        ToolInvocation::new(
            ToolKind::DoviTool,
            ["info".to_string(), "-i".to_string(), arg(rpu), "--summary".to_string()],
        )
    }
}
