use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool error: {message}")]
    Tool { message: String },

    #[error("{tool} failed (see log: {})", log.display())]
    ToolFailed { tool: String, log: PathBuf },

    #[error("Missing artifact: {message}")]
    MissingArtifact { message: String },

    #[error("Unsupported HDR format: {message}")]
    UnsupportedFormat { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Verification failed: {message}")]
    Verification { message: String },

    #[error("Missing dependencies: {0}")]
    Dependency(String),

    #[error("Dolby Vision error: {0}")]
    DolbyVision(String),
}

impl Error {
    pub fn tool<T: Into<String>>(message: T) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    pub fn tool_failed<T: Into<String>>(tool: T, log: PathBuf) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            log,
        }
    }

    pub fn missing_artifact<T: Into<String>>(message: T) -> Self {
        Self::MissingArtifact {
            message: message.into(),
        }
    }

    pub fn unsupported_format<T: Into<String>>(message: T) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    pub fn parse<T: Into<String>>(message: T) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn verification<T: Into<String>>(message: T) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }
}
