pub mod tool;

pub use tool::{MkvMergeTool, MuxOptions};
