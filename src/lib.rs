pub mod cli;
pub mod config;
pub mod dolby_vision;
pub mod hdr;
pub mod hdr10plus;
pub mod measurements;
pub mod mkvmerge;
pub mod processing;
pub mod utils;
pub mod verify;

pub use config::{Config, ConversionSettings};
pub use hdr::{HdrVariant, StaticMetadata, TrimTargets};
pub use processing::{BatchSummary, Converter, FileOutcome, Workspace};
pub use utils::{Error, Result};
pub use verify::{PostMuxVerifier, VerificationReport};
