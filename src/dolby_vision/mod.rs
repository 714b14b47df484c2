pub mod rpu;
pub mod tools;

pub use rpu::{Level6, RpuParameters, RpuSummary};
pub use tools::DoviTool;
