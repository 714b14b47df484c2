use crate::config::ToolKind;
use crate::utils::tool_runner::ToolInvocation;
use std::path::Path;

/// Log phrase hdr10plus_tool prints when a stream tagged HDR10+ has no
/// ST 2094-40 SEI payloads.
const NO_DYNAMIC_METADATA: &str = "doesn't contain dynamic metadata";

/// Wrapper for the hdr10plus_tool external binary.
pub struct Hdr10PlusTool;

impl Hdr10PlusTool {
    /// Extracts the dynamic metadata of a raw HEVC stream to JSON.
    pub fn extract(hevc: &Path, output_json: &Path) -> ToolInvocation {
        ToolInvocation::new(
            ToolKind::Hdr10PlusTool,
            [
                "extract".to_string(),
                "-i".to_string(),
                hevc.display().to_string(),
                "-o".to_string(),
                output_json.display().to_string(),
            ],
        )
    }

    /// True when an extraction log shows the stream carries no HDR10+ payloads.
    pub fn reports_no_dynamic_metadata(log: &str) -> bool {
        log.to_lowercase().contains(NO_DYNAMIC_METADATA)
    }
}
