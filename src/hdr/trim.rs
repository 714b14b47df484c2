use super::metadata::parse_decimal;
use super::types::TrimTargets;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{info, warn};

static REAL_PEAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Real\s+display\s+peak\s+nits:\s*([0-9.,]+)").unwrap());

static MAX_TARGET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Maximum\s+Target\s+Nits:\s*([0-9.,]+)").unwrap());

/// Always part of a derived set.
const BASE_TARGET_NITS: u32 = 100;

fn positive_nits(re: &Regex, text: &str) -> Option<u32> {
    let value = parse_decimal(re.captures(text)?.get(1)?.as_str())?;
    let rounded = value.round();
    (rounded > 0.0).then_some(rounded as u32)
}

/// Derives trim targets from a madVR `Details.txt` text.
///
/// Returns `None` when fewer than two distinct plausible values remain, which
/// tells the caller to use its configured list instead.
pub fn derive_trim_targets(details: &str) -> Option<TrimTargets> {
    let candidates = [
        Some(BASE_TARGET_NITS),
        positive_nits(&REAL_PEAK_REGEX, details),
        positive_nits(&MAX_TARGET_REGEX, details),
    ];

    let targets = TrimTargets::new(
        candidates
            .into_iter()
            .flatten()
            .filter(|v| (TrimTargets::MIN_NITS..=TrimTargets::MAX_NITS).contains(v)),
    );

    (targets.len() >= 2).then_some(targets)
}

/// Trim targets for one file: derived from its calibration log when enabled
/// and usable, else the configured list.
pub fn resolve_trim_targets(
    details: Option<&Path>,
    from_details: bool,
    fallback: &TrimTargets,
) -> TrimTargets {
    if from_details {
        if let Some(path) = details {
            match std::fs::read(path) {
                Ok(bytes) => {
                    if let Some(targets) = derive_trim_targets(&String::from_utf8_lossy(&bytes)) {
                        info!("Trim targets from {}: {}", path.display(), targets);
                        return targets;
                    }
                    info!("Details file gave no usable trim targets");
                }
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }
    }

    info!("Using configured trim targets: {}", fallback);
    fallback.clone()
}
