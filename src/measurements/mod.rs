//! madVR-format measurement files: generating them with the analyzer and
//! checking them with the verifier.

pub mod analyzer;
pub mod verifier;

pub use analyzer::{analyze, measurements_output_path, AnalyzerOptions};
pub use verifier::{parse_frame_count, verify_measurements};
