use crate::config::ToolKind;
use crate::utils::tool_runner::ToolInvocation;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static FRAME_COUNT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Frame count:\s*(\d+)").unwrap());

/// Checks a measurements file and prints its header.
pub fn verify_measurements(measurements: &Path) -> ToolInvocation {
    ToolInvocation::new(ToolKind::Verifier, [measurements.display().to_string()])
}

/// Frame count from the measurements header as printed by the verifier.
pub fn parse_frame_count(log: &str) -> Option<u64> {
    FRAME_COUNT_REGEX
        .captures(log)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}
