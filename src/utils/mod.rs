pub mod error;
pub mod ffmpeg;
pub mod filesystem;
pub mod logging;
pub mod tool_runner;

pub use error::{Error, Result};
pub use filesystem::{collect_inputs, find_video_files};
pub use logging::setup_logging;
pub use tool_runner::{CommandRunner, ProcessRunner, ToolInvocation, ToolPaths};
