use crate::hdr::types::TrimTargets;
use serde::{Deserialize, Serialize};
use std::fmt;

/// External executables the converter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Ffmpeg,
    Ffprobe,
    MediaInfo,
    MkvMerge,
    DoviTool,
    Hdr10PlusTool,
    Analyzer,
    Verifier,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Ffmpeg,
        ToolKind::Ffprobe,
        ToolKind::MediaInfo,
        ToolKind::MkvMerge,
        ToolKind::DoviTool,
        ToolKind::Hdr10PlusTool,
        ToolKind::Analyzer,
        ToolKind::Verifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ffmpeg => "ffmpeg",
            Self::Ffprobe => "ffprobe",
            Self::MediaInfo => "mediainfo",
            Self::MkvMerge => "mkvmerge",
            Self::DoviTool => "dovi_tool",
            Self::Hdr10PlusTool => "hdr10plus_tool",
            Self::Analyzer => "hdr_analyzer_mvp",
            Self::Verifier => "verifier",
        }
    }

    /// Alternative executable names tried when the configured one is not found.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Analyzer => &["hdranalyze"],
            _ => &[],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub mediainfo: String,
    pub mkvmerge: String,
    pub dovi_tool: String,
    pub hdr10plus_tool: String,
    pub analyzer: String,
    pub verifier: String,
}

impl ToolsConfig {
    pub fn configured(&self, tool: ToolKind) -> &str {
        match tool {
            ToolKind::Ffmpeg => &self.ffmpeg,
            ToolKind::Ffprobe => &self.ffprobe,
            ToolKind::MediaInfo => &self.mediainfo,
            ToolKind::MkvMerge => &self.mkvmerge,
            ToolKind::DoviTool => &self.dovi_tool,
            ToolKind::Hdr10PlusTool => &self.hdr10plus_tool,
            ToolKind::Analyzer => &self.analyzer,
            ToolKind::Verifier => &self.verifier,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: ToolKind::Ffmpeg.as_str().to_string(),
            ffprobe: ToolKind::Ffprobe.as_str().to_string(),
            mediainfo: ToolKind::MediaInfo.as_str().to_string(),
            mkvmerge: ToolKind::MkvMerge.as_str().to_string(),
            dovi_tool: ToolKind::DoviTool.as_str().to_string(),
            hdr10plus_tool: ToolKind::Hdr10PlusTool.as_str().to_string(),
            analyzer: ToolKind::Analyzer.as_str().to_string(),
            verifier: ToolKind::Verifier.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_timestamps: bool,
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_timestamps: true,
            colored_output: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub temp_root: String,
    pub temp_prefix: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            temp_root: ".".to_string(),
            temp_prefix: "dv_converter_temp_".to_string(),
        }
    }
}

/// Which HDR10+ statistic dovi_tool uses as the per-shot peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PeakSource {
    /// Max SCL from the metadata (most conservative, can look dim)
    MaxSclLuminance,
    /// Histogram maximum
    Histogram,
    /// 99th percentile of the histogram
    Histogram99,
}

impl PeakSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxSclLuminance => "max-scl-luminance",
            Self::Histogram => "histogram",
            Self::Histogram99 => "histogram99",
        }
    }
}

impl fmt::Display for PeakSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerProfile {
    Conservative,
    Balanced,
    Aggressive,
}

impl OptimizerProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for OptimizerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HwAccel {
    None,
    Cuda,
}

impl HwAccel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Cuda => "cuda",
        }
    }
}

impl fmt::Display for HwAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run conversion settings, resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSettings {
    pub peak_source: PeakSource,
    pub trim_targets: TrimTargets,
    pub trim_from_details: bool,
    pub drop_chapters: bool,
    pub drop_tags: bool,
    pub hlg_crf: u8,
    pub hlg_preset: String,
    pub hlg_peak_nits: u32,
    pub verify: bool,
    pub boost_experimental: bool,
    pub optimizer_profile: OptimizerProfile,
    pub keep_source: bool,
    pub hwaccel: HwAccel,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            peak_source: PeakSource::Histogram99,
            trim_targets: TrimTargets::new([100, 600, 1000]),
            trim_from_details: true,
            drop_chapters: false,
            drop_tags: false,
            hlg_crf: 17,
            hlg_preset: "medium".to_string(),
            hlg_peak_nits: 1000,
            verify: false,
            boost_experimental: false,
            optimizer_profile: OptimizerProfile::Conservative,
            keep_source: false,
            hwaccel: HwAccel::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_match_executables() {
        assert_eq!(ToolKind::DoviTool.to_string(), "dovi_tool");
        assert_eq!(ToolKind::Analyzer.aliases(), &["hdranalyze"]);
        assert!(ToolKind::Ffmpeg.aliases().is_empty());
    }

    #[test]
    fn test_tools_config_lookup() {
        let mut tools = ToolsConfig::default();
        tools.dovi_tool = "/opt/dovi/dovi_tool".to_string();
        assert_eq!(tools.configured(ToolKind::DoviTool), "/opt/dovi/dovi_tool");
        assert_eq!(tools.configured(ToolKind::MkvMerge), "mkvmerge");
    }

    #[test]
    fn test_peak_source_cli_strings() {
        assert_eq!(PeakSource::Histogram99.as_str(), "histogram99");
        assert_eq!(PeakSource::MaxSclLuminance.as_str(), "max-scl-luminance");
    }
}
