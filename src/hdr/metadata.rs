use super::probe::{MediaInfoReport, MediaProbe, MetadataCache};
use super::types::StaticMetadata;
use crate::utils::tool_runner::CommandRunner;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, info, warn};

static NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+[.,]?[0-9]*)").unwrap());

static MDL_MAX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"max:\s*([0-9]+[.,]?[0-9]*)").unwrap());

static MDL_MIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"min:\s*([0-9]+[.,]?[0-9]*)").unwrap());

static DETAILS_LUMINANCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Mastering\s+display\s+luminance:\s*([0-9.,]+)\s*/\s*([0-9.,]+)").unwrap()
});

static DETAILS_CLL_100_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)MaxCLL\s*100%\s*:\s*([0-9.,]+)").unwrap());

static DETAILS_CLL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^MaxCLL\s*:\s*([0-9.,]+)$").unwrap());

static DETAILS_FALL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^MaxFALL\s*:\s*([0-9.,]+)").unwrap());

static AFTER_CLIPPING_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Calculated values after clipping").unwrap());

/// First number in `text`, accepting a comma as decimal separator.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let raw = NUMBER_REGEX.captures(text)?.get(1)?.as_str();
    raw.replace(',', ".").trim_end_matches('.').parse().ok()
}

/// Static values found in one source; `None` means the source did not say.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialStaticMetadata {
    pub max_display_luminance: Option<u32>,
    pub min_display_luminance: Option<f64>,
    pub max_content_light_level: Option<u32>,
    pub max_frame_average_light_level: Option<u32>,
}

impl PartialStaticMetadata {
    /// Fields set in `other` replace ours.
    pub fn overlay(&mut self, other: PartialStaticMetadata) {
        if other.max_display_luminance.is_some() {
            self.max_display_luminance = other.max_display_luminance;
        }
        if other.min_display_luminance.is_some() {
            self.min_display_luminance = other.min_display_luminance;
        }
        if other.max_content_light_level.is_some() {
            self.max_content_light_level = other.max_content_light_level;
        }
        if other.max_frame_average_light_level.is_some() {
            self.max_frame_average_light_level = other.max_frame_average_light_level;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fills unset or zero fields with defaults, returning the names of the
    /// fields that were substituted.
    pub fn resolve(&self) -> (StaticMetadata, Vec<&'static str>) {
        let defaults = StaticMetadata::default();
        let mut substituted = Vec::new();

        let max_dml = pick_positive(
            self.max_display_luminance,
            defaults.max_display_luminance,
            "MaxDML",
            &mut substituted,
        );
        let min_dml = match self.min_display_luminance {
            Some(v) if v > 0.0 => v,
            _ => {
                substituted.push("MinDML");
                defaults.min_display_luminance
            }
        };
        let max_cll = pick_positive(
            self.max_content_light_level,
            defaults.max_content_light_level,
            "MaxCLL",
            &mut substituted,
        );
        let max_fall = pick_positive(
            self.max_frame_average_light_level,
            defaults.max_frame_average_light_level,
            "MaxFALL",
            &mut substituted,
        );

        (
            StaticMetadata {
                max_display_luminance: max_dml,
                min_display_luminance: min_dml,
                max_content_light_level: max_cll,
                max_frame_average_light_level: max_fall,
            },
            substituted,
        )
    }
}

fn pick_positive(
    value: Option<u32>,
    default: u32,
    name: &'static str,
    substituted: &mut Vec<&'static str>,
) -> u32 {
    match value {
        Some(v) if v > 0 => v,
        _ => {
            substituted.push(name);
            default
        }
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Static values from a mediainfo video track.
pub fn static_values_from_media_info(report: &MediaInfoReport) -> PartialStaticMetadata {
    let mut values = PartialStaticMetadata::default();

    if let Some(mdl) = report.video_str("MasteringDisplay_Luminance") {
        let capture = |re: &Regex| {
            re.captures(mdl)
                .and_then(|c| c.get(1))
                .and_then(|m| parse_decimal(m.as_str()))
        };
        values.max_display_luminance = capture(&*MDL_MAX_REGEX).map(|v| v as u32);
        values.min_display_luminance = capture(&*MDL_MIN_REGEX);
    }

    values.max_content_light_level = report
        .video_field("MaxCLL")
        .and_then(value_number)
        .map(|v| v as u32);
    values.max_frame_average_light_level = report
        .video_field("MaxFALL")
        .and_then(value_number)
        .map(|v| v as u32);

    values
}

/// Static values from a madVR `Details.txt` calibration log.
///
/// A `MaxCLL:` line in the "Calculated values after clipping" section takes
/// precedence over the first `MaxCLL 100%:` line.
pub fn static_values_from_details(text: &str) -> PartialStaticMetadata {
    let mut values = PartialStaticMetadata::default();
    let mut after_clipping = false;
    let mut max_cll_100: Option<u32> = None;
    let mut max_cll_clipped: Option<u32> = None;

    let first_number = |re: &Regex, line: &str| {
        re.captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| parse_decimal(m.as_str()))
    };

    for line in text.lines().map(str::trim) {
        if AFTER_CLIPPING_REGEX.is_match(line) {
            after_clipping = true;
            continue;
        }

        if let Some(caps) = DETAILS_LUMINANCE_REGEX.captures(line) {
            if let Some(min) = caps.get(1).and_then(|m| parse_decimal(m.as_str())) {
                values.min_display_luminance = Some(min);
            }
            if let Some(max) = caps.get(2).and_then(|m| parse_decimal(m.as_str())) {
                values.max_display_luminance = Some(max as u32);
            }
            continue;
        }

        if DETAILS_CLL_100_REGEX.is_match(line) {
            if max_cll_100.is_none() {
                max_cll_100 = first_number(&*DETAILS_CLL_100_REGEX, line).map(|v| v as u32);
            }
            continue;
        }

        if after_clipping {
            if let Some(v) = first_number(&*DETAILS_CLL_REGEX, line) {
                max_cll_clipped = Some(v as u32);
                continue;
            }
        }

        if values.max_frame_average_light_level.is_none() {
            if let Some(v) = first_number(&*DETAILS_FALL_REGEX, line) {
                values.max_frame_average_light_level = Some(v as u32);
            }
        }
    }

    values.max_content_light_level = max_cll_clipped.or(max_cll_100);
    values
}

/// Outcome of the plausibility check; never blocks a conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    pub fn log(&self, source: &str) {
        if !self.errors.is_empty() {
            error!("Metadata validation errors for {}:", source);
            for issue in &self.errors {
                error!("  • {}", issue);
            }
        }
        if !self.warnings.is_empty() {
            warn!("Metadata validation warnings for {}:", source);
            for warning in &self.warnings {
                warn!("  • {}", warning);
            }
        }
        if !self.is_clean() {
            warn!("Proceeding with caution");
        }
    }
}

pub fn validate_static_metadata(metadata: &StaticMetadata) -> ValidationReport {
    let mut report = ValidationReport::default();
    let max_dml = metadata.max_display_luminance;
    let min_dml = metadata.min_display_luminance;
    let max_cll = metadata.max_content_light_level;
    let max_fall = metadata.max_frame_average_light_level;

    if max_dml < 100 {
        report
            .warnings
            .push(format!("MaxDML={} is unusually low (<100 nits)", max_dml));
    } else if max_dml > 10000 {
        report
            .errors
            .push(format!("MaxDML={} exceeds ST.2084 range (10000 nits)", max_dml));
    }

    if min_dml > 0.05 {
        report.warnings.push(format!(
            "MinDML={} is unusually high (>0.05 nits, typical OLED ~0.005)",
            min_dml
        ));
    } else if min_dml <= 0.0 {
        report
            .errors
            .push(format!("MinDML={} must be positive", min_dml));
    }

    if max_cll == 0 {
        report.errors.push("MaxCLL=0 must be positive".to_string());
    } else if max_cll > 10000 {
        report
            .warnings
            .push(format!("MaxCLL={} exceeds ST.2084 range (10000 nits)", max_cll));
    }

    if max_fall == 0 {
        report.errors.push("MaxFALL=0 must be positive".to_string());
    } else if max_fall > 10000 {
        report
            .warnings
            .push(format!("MaxFALL={} exceeds ST.2084 range (10000 nits)", max_fall));
    }

    if max_cll > 0 && max_fall > 0 && max_cll < max_fall {
        report.warnings.push(format!(
            "MaxCLL={} < MaxFALL={} (peak should be >= average)",
            max_cll, max_fall
        ));
    }

    report
}

/// Reconciles mediainfo tags and the calibration log into a complete
/// [`StaticMetadata`].
pub struct MetadataExtractor<'a, R: CommandRunner> {
    probe: MediaProbe<'a, R>,
}

impl<'a, R: CommandRunner> MetadataExtractor<'a, R> {
    pub fn new(runner: &'a R, cache: &'a MetadataCache) -> Self {
        Self {
            probe: MediaProbe::new(runner, cache),
        }
    }

    pub async fn extract(&self, input: &Path, details: Option<&Path>) -> StaticMetadata {
        let mut values = match self.probe.media_info(input).await {
            Some(report) => static_values_from_media_info(&report),
            None => {
                warn!("Could not get metadata from mediainfo for {}", input.display());
                PartialStaticMetadata::default()
            }
        };

        if let Some(details) = details {
            match std::fs::read(details) {
                Ok(bytes) => {
                    let parsed = static_values_from_details(&String::from_utf8_lossy(&bytes));
                    if !parsed.is_empty() {
                        info!("Supplemented static metadata from {}", details.display());
                        debug!("Details values: {:?}", parsed);
                        values.overlay(parsed);
                    }
                }
                Err(e) => warn!("Could not read {}: {}", details.display(), e),
            }
        }

        let (metadata, substituted) = values.resolve();
        for field in &substituted {
            warn!("Missing {} metadata, using default", field);
        }
        if !substituted.is_empty() {
            let defaults = StaticMetadata::default();
            warn!(
                "Defaults: MaxDML={}, MinDML={}, MaxCLL={}, MaxFALL={}",
                defaults.max_display_luminance,
                defaults.min_display_luminance,
                defaults.max_content_light_level,
                defaults.max_frame_average_light_level
            );
        }

        info!(
            "Static metadata: MaxDML={} MinDML={} MaxCLL={} MaxFALL={}",
            metadata.max_display_luminance,
            metadata.min_display_luminance,
            metadata.max_content_light_level,
            metadata.max_frame_average_light_level
        );
        metadata
    }
}
