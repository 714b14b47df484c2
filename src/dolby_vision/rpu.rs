use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::hdr::types::{StaticMetadata, TrimTargets};
use crate::utils::{Error, Result};

static FRAMES_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*Frames?:\s*(\d+)\s*$").unwrap());

static PROFILE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"Profile\s*:?\s+([0-9.]+)").unwrap());

/// `level6` block of the generate config: HDR10 static metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level6 {
    pub max_display_mastering_luminance: u32,
    /// In units of 0.0001 nits.
    pub min_display_mastering_luminance: u32,
    pub max_content_light_level: u32,
    pub max_frame_average_light_level: u32,
}

/// The `extra.json` config passed to `dovi_tool generate -j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpuParameters {
    pub target_nits: Vec<u32>,
    pub level6: Level6,
}

impl RpuParameters {
    pub fn new(metadata: &StaticMetadata, trims: &TrimTargets) -> Self {
        Self {
            target_nits: trims.values().to_vec(),
            level6: Level6 {
                max_display_mastering_luminance: metadata.max_display_luminance,
                min_display_mastering_luminance: (metadata.min_display_luminance * 10000.0).round() as u32,
                max_content_light_level: metadata.max_content_light_level,
                max_frame_average_light_level: metadata.max_frame_average_light_level,
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if self.target_nits.is_empty() {
            return Err(Error::DolbyVision(
                "RPU generation needs at least one trim target".to_string(),
            ));
        }
        let json = self.to_json()?;
        std::fs::write(path, &json)?;
        info!("Generated {}", path.display());
        debug!("{}", json);
        Ok(())
    }
}

/// Fields of interest from `dovi_tool info --summary`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpuSummary {
    pub frames: Option<u64>,
    pub profile: Option<String>,
}

impl RpuSummary {
    pub fn parse(text: &str) -> Self {
        Self {
            frames: FRAMES_REGEX
                .captures(text)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok()),
            profile: PROFILE_REGEX
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        }
    }

    /// Profile 8 with any sub-profile (8.1, 8.4, ...).
    pub fn is_profile_8(&self) -> bool {
        self.profile
            .as_deref()
            .map(|p| p == "8" || p.starts_with("8."))
            .unwrap_or(false)
    }
}
