use crate::config::{ConversionSettings, HwAccel, OptimizerProfile, PeakSource};
use crate::hdr::types::TrimTargets;
use crate::utils::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(name = "dv-converter")]
#[command(about = "Convert HDR10, HDR10+ and HLG MKV files to Dolby Vision Profile 8.1")]
#[command(long_about = "
Converts HDR10, HDR10+ and HLG Matroska files into Dolby Vision Profile 8.1 by
driving ffmpeg, dovi_tool, hdr10plus_tool, mkvmerge and a madVR-format
measurement analyzer. Each input produces <name>.DV.mkv next to it; existing
outputs are skipped.

EXAMPLES:
  # Convert every .mkv in the current directory
  dv-converter

  # Convert a file, keeping the source and the temp directory
  dv-converter Movie.mkv --keep-source

  # Brighter HDR10+ mapping, verify the result afterwards
  dv-converter -b --verify ~/Videos/HDR/

  # HLG broadcast recording mastered at 1000 nits, GPU-assisted
  dv-converter --hlg-peak-nits 1000 --hwaccel cuda recording.mkv
")]
pub struct CliArgs {
    /// Input files or directories (directories are searched for .mkv files).
    /// Without inputs, every .mkv in the current directory is converted.
    #[arg(value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Statistic dovi_tool uses as the per-shot peak of HDR10+ metadata
    #[arg(long, value_enum, default_value_t = PeakSource::Histogram99)]
    pub peak_source: PeakSource,

    /// Comma-separated nits values for the Dolby Vision trim pass
    #[arg(long, default_value = "100,600,1000", value_name = "LIST")]
    pub trim_targets: String,

    /// Derive trim targets from the madVR Details.txt next to the input
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub trim_from_details: bool,

    /// Same as --trim-from-details false
    #[arg(long, hide = true)]
    pub no_trim_from_details: bool,

    /// Drop chapters in the output file (kept by default)
    #[arg(long)]
    pub drop_chapters: bool,

    /// Drop global tags in the output file (kept by default)
    #[arg(long)]
    pub drop_tags: bool,

    /// CRF for the HLG to PQ re-encode
    #[arg(long, default_value_t = 17)]
    pub hlg_crf: u8,

    /// x265 preset for the HLG to PQ re-encode
    #[arg(long, default_value = "medium")]
    pub hlg_preset: String,

    /// Nominal peak luminance of HLG content in nits
    #[arg(long, default_value_t = 1000)]
    pub hlg_peak_nits: u32,

    /// After muxing, cross-check frame counts and Dolby Vision tags; failure marks the file failed
    #[arg(long)]
    pub verify: bool,

    /// Brighter HDR10+ mapping: switches max-scl-luminance and histogram to histogram99
    #[arg(short, long)]
    pub boost: bool,

    /// Use the analyzer's aggressive optimizer when measurements have to be generated
    #[arg(long)]
    pub boost_experimental: bool,

    /// Optimizer profile for the measurement analyzer
    #[arg(long, value_enum, default_value_t = OptimizerProfile::Conservative)]
    pub optimizer_profile: OptimizerProfile,

    /// Keep the source, its side files and the temp directory after a successful conversion
    #[arg(long)]
    pub keep_source: bool,

    /// Hardware acceleration for analysis and HLG re-encoding
    #[arg(long, value_enum, default_value_t = HwAccel::None)]
    pub hwaccel: HwAccel,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Report which external tools were found and exit
    #[arg(long)]
    pub check_tools: bool,
}

impl CliArgs {
    pub fn get_log_level<'a>(&self, config_level: &'a str) -> &'a str {
        if self.verbose {
            "debug"
        } else {
            config_level
        }
    }

    pub fn effective_peak_source(&self) -> PeakSource {
        match self.peak_source {
            PeakSource::MaxSclLuminance | PeakSource::Histogram if self.boost => {
                info!("Boost mode enabled: using --peak-source=histogram99 for HDR10+ peak detection");
                PeakSource::Histogram99
            }
            other => other,
        }
    }

    pub fn conversion_settings(&self) -> Result<ConversionSettings> {
        Ok(ConversionSettings {
            peak_source: self.effective_peak_source(),
            trim_targets: TrimTargets::parse_list(&self.trim_targets)?,
            trim_from_details: self.trim_from_details && !self.no_trim_from_details,
            drop_chapters: self.drop_chapters,
            drop_tags: self.drop_tags,
            hlg_crf: self.hlg_crf,
            hlg_preset: self.hlg_preset.clone(),
            hlg_peak_nits: self.hlg_peak_nits,
            verify: self.verify,
            boost_experimental: self.boost_experimental,
            optimizer_profile: self.optimizer_profile,
            keep_source: self.keep_source,
            hwaccel: self.hwaccel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Error;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("dv-converter").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_match_conversion_defaults() {
        let args = parse(&[]);
        assert!(args.inputs.is_empty());
        assert_eq!(args.conversion_settings().unwrap(), ConversionSettings::default());
    }

    #[test]
    fn test_boost_only_raises_lower_peak_sources() {
        let args = parse(&["-b", "--peak-source", "max-scl-luminance"]);
        assert_eq!(args.effective_peak_source(), PeakSource::Histogram99);

        let args = parse(&["--peak-source", "histogram"]);
        assert_eq!(args.effective_peak_source(), PeakSource::Histogram);
    }

    #[test]
    fn test_trim_from_details_can_be_disabled_both_ways() {
        assert!(!parse(&["--no-trim-from-details"]).conversion_settings().unwrap().trim_from_details);
        assert!(!parse(&["--trim-from-details", "false"]).conversion_settings().unwrap().trim_from_details);
    }

    #[test]
    fn test_invalid_trim_targets_are_rejected() {
        let args = parse(&["--trim-targets", "100,abc"]);
        assert!(matches!(args.conversion_settings(), Err(Error::Validation { .. } | Error::Parse { .. })));
    }

    #[test]
    fn test_inputs_and_options() {
        let args = parse(&[
            "a.mkv",
            "dir",
            "--hwaccel",
            "cuda",
            "--optimizer-profile",
            "balanced",
            "--keep-source",
            "-v",
        ]);
        assert_eq!(args.inputs, vec![PathBuf::from("a.mkv"), PathBuf::from("dir")]);
        let settings = args.conversion_settings().unwrap();
        assert_eq!(settings.hwaccel, HwAccel::Cuda);
        assert_eq!(settings.optimizer_profile, OptimizerProfile::Balanced);
        assert!(settings.keep_source);
        assert_eq!(args.get_log_level("info"), "debug");
    }
}
