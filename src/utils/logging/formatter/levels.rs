//! Hierarchy level of a console message, picked from its wording.

use console::style;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingLevel {
    Root,   // One per input file
    Stage,  // Classification and outcome of a file
    Step,   // Individual pipeline steps
    Detail,
}

const ROOT_MARKERS: &[&str] = &["Processing file", "file(s) to convert", "Batch complete"];

const STAGE_MARKERS: &[&str] = &[
    "Detected",
    "Conversion plan:",
    "Success! Created",
    "Verification passed",
    "Verification failed",
    "Unsupported HDR format",
    "falling back to HDR10 analysis",
];

const STEP_MARKERS: &[&str] = &[
    "Extracting HEVC stream",
    "Extracting HDR10+ metadata",
    "Generating measurements",
    "Converting HLG to PQ",
    "Writing RPU parameters",
    "Generating RPU",
    "Extracting BL to HEVC",
    "Injecting RPU",
    "Muxing final MKV",
    "Copying source timestamps",
    "Verifying",
    "Cleaning up",
    "Static metadata:",
    "Trim targets",
    "trim targets",
];

impl ProcessingLevel {
    pub fn of(message: &str) -> Self {
        let matches = |markers: &[&str]| markers.iter().any(|m| message.contains(m));

        if matches(ROOT_MARKERS) {
            Self::Root
        } else if matches(STAGE_MARKERS) {
            Self::Stage
        } else if matches(STEP_MARKERS) && !message.starts_with("  ") {
            Self::Step
        } else {
            Self::Detail
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Root => "▶",
            Self::Stage => "●",
            Self::Step | Self::Detail => " ",
        }
    }

    pub fn paint(&self, message: &str, use_color: bool) -> String {
        if !use_color {
            return message.to_string();
        }
        match self {
            Self::Root => style(message).bold().cyan().to_string(),
            Self::Stage => style(message).bold().green().to_string(),
            Self::Step => style(message).cyan().to_string(),
            Self::Detail => style(message).dim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_batch_messages_are_root() {
        assert_eq!(ProcessingLevel::of("Processing file: Movie.mkv"), ProcessingLevel::Root);
        assert_eq!(
            ProcessingLevel::of("Batch complete: 2 converted, 0 skipped, 0 failed"),
            ProcessingLevel::Root
        );
    }

    #[test]
    fn test_classification_and_outcome_are_stages() {
        assert_eq!(ProcessingLevel::of("Detected HDR10+ via mediainfo HDR format"), ProcessingLevel::Stage);
        assert_eq!(ProcessingLevel::of("Success! Created: Movie.DV.mkv"), ProcessingLevel::Stage);
    }

    #[test]
    fn test_pipeline_steps() {
        assert_eq!(ProcessingLevel::of("Generating RPU..."), ProcessingLevel::Step);
        assert_eq!(ProcessingLevel::of("Muxing final MKV..."), ProcessingLevel::Step);
        // Indented log lines stay details even if they mention a step.
        assert_eq!(ProcessingLevel::of("  Injecting RPU failed"), ProcessingLevel::Detail);
        assert_eq!(ProcessingLevel::of("dovi_tool finished"), ProcessingLevel::Detail);
    }

    #[test]
    fn test_plain_paint_is_unchanged() {
        assert_eq!(ProcessingLevel::Root.paint("Processing file", false), "Processing file");
        assert!(ProcessingLevel::Stage.paint("Detected HLG", true).contains("Detected HLG"));
        assert_eq!(ProcessingLevel::Root.prefix(), "▶");
        assert_eq!(ProcessingLevel::Detail.prefix(), " ");
    }
}
