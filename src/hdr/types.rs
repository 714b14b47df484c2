use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HdrVariant {
    Hdr10Plus,             // ST 2094-40 dynamic metadata present
    Hdr10WithMeasurements, // PQ with a madVR measurements file next to it
    Hdr10Unsupported,      // PQ without usable dynamic metadata
    Hlg,                   // ARIB STD-B67
    Unsupported,           // SDR or unrecognised
}

impl HdrVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hdr10Plus => "HDR10+",
            Self::Hdr10WithMeasurements => "HDR10 (with measurements)",
            Self::Hdr10Unsupported => "HDR10 (no dynamic metadata)",
            Self::Hlg => "HLG",
            Self::Unsupported => "Unsupported",
        }
    }
}

impl fmt::Display for HdrVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw transfer-characteristic evidence found by a detection tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdrSignal {
    Hdr10Plus,
    Hlg,
    Pq,
}

impl HdrSignal {
    /// PQ resolves by whether measurements exist; the other signals are final.
    pub fn resolve(self, measurements_found: bool) -> HdrVariant {
        match self {
            Self::Hdr10Plus => HdrVariant::Hdr10Plus,
            Self::Hlg => HdrVariant::Hlg,
            Self::Pq if measurements_found => HdrVariant::Hdr10WithMeasurements,
            Self::Pq => HdrVariant::Hdr10Unsupported,
        }
    }
}

/// Which probe produced the deciding signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionTier {
    FormatString,
    TrackFields,
    ColorTransfer,
}

impl fmt::Display for DetectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FormatString => "mediainfo HDR format",
            Self::TrackFields => "mediainfo track fields",
            Self::ColorTransfer => "ffprobe color transfer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub variant: HdrVariant,
    pub tier: Option<DetectionTier>,
    pub measurements: Option<PathBuf>,
    /// Compact probe string as reported, for diagnostics.
    pub raw_probe: String,
    /// Set when the compact probe ran but failed outright.
    pub probe_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticMetadata {
    pub max_display_luminance: u32, // nits
    pub min_display_luminance: f64, // nits
    pub max_content_light_level: u32,
    pub max_frame_average_light_level: u32,
}

impl StaticMetadata {
    pub const DEFAULT_MAX_DML: u32 = 1000;
    pub const DEFAULT_MIN_DML: f64 = 0.005;
    pub const DEFAULT_MAX_CLL: u32 = 1000;
    pub const DEFAULT_MAX_FALL: u32 = 400;
}

impl Default for StaticMetadata {
    fn default() -> Self {
        Self {
            max_display_luminance: Self::DEFAULT_MAX_DML,
            min_display_luminance: Self::DEFAULT_MIN_DML,
            max_content_light_level: Self::DEFAULT_MAX_CLL,
            max_frame_average_light_level: Self::DEFAULT_MAX_FALL,
        }
    }
}

/// Sorted, distinct trim-pass target luminances in nits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimTargets(Vec<u32>);

impl TrimTargets {
    pub const MIN_NITS: u32 = 80;
    pub const MAX_NITS: u32 = 10000;

    pub fn new<I: IntoIterator<Item = u32>>(values: I) -> Self {
        let mut values: Vec<u32> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Self(values)
    }

    /// Parses a comma-separated list such as `100,600,1000`.
    pub fn parse_list(list: &str) -> Result<Self> {
        let mut values = Vec::new();
        for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let value: u32 = item
                .parse()
                .map_err(|_| Error::parse(format!("Invalid trim target '{}'", item)))?;
            if !(Self::MIN_NITS..=Self::MAX_NITS).contains(&value) {
                return Err(Error::validation(format!(
                    "Trim target {} outside {}-{} nits",
                    value,
                    Self::MIN_NITS,
                    Self::MAX_NITS
                )));
            }
            values.push(value);
        }

        if values.is_empty() {
            return Err(Error::validation("Trim target list is empty"));
        }
        Ok(Self::new(values))
    }

    pub fn values(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrimTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&list.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pq_signal_depends_on_measurements() {
        assert_eq!(HdrSignal::Pq.resolve(true), HdrVariant::Hdr10WithMeasurements);
        assert_eq!(HdrSignal::Pq.resolve(false), HdrVariant::Hdr10Unsupported);
        assert_eq!(HdrSignal::Hdr10Plus.resolve(true), HdrVariant::Hdr10Plus);
        assert_eq!(HdrSignal::Hlg.resolve(true), HdrVariant::Hlg);
    }

    #[test]
    fn test_static_metadata_defaults() {
        let defaults = StaticMetadata::default();
        assert_eq!(defaults.max_display_luminance, 1000);
        assert_eq!(defaults.min_display_luminance, 0.005);
        assert_eq!(defaults.max_content_light_level, 1000);
        assert_eq!(defaults.max_frame_average_light_level, 400);
    }

    #[test]
    fn test_trim_targets_sorted_and_distinct() {
        let targets = TrimTargets::new([1000, 100, 600, 100]);
        assert_eq!(targets.values(), &[100, 600, 1000]);
        assert_eq!(targets.to_string(), "100, 600, 1000");
    }

    #[test]
    fn test_trim_list_parsing() {
        assert_eq!(
            TrimTargets::parse_list(" 600,100 ,1000").unwrap().values(),
            &[100, 600, 1000]
        );
        assert!(matches!(
            TrimTargets::parse_list("100,abc"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            TrimTargets::parse_list("50,100"),
            Err(Error::Validation { .. })
        ));
        assert!(TrimTargets::parse_list("").is_err());
    }
}
