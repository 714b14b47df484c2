pub mod detection;
pub mod metadata;
pub mod probe;
pub mod trim;
pub mod types;

pub use detection::FormatClassifier;
pub use metadata::{validate_static_metadata, MetadataExtractor, ValidationReport};
pub use probe::{MediaInfoReport, MediaProbe, MetadataCache};
pub use trim::{derive_trim_targets, resolve_trim_targets};
pub use types::*;
