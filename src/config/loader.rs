use super::types::*;
use crate::utils::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCAL_CONFIG_NAME: &str = "dv_converter.yaml";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub workspace: WorkspaceConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the explicit path if given, otherwise the first discovered config
    /// file, otherwise built-in defaults.
    pub fn load_with_fallback(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::discover() {
            Some(path) => {
                debug!("Using configuration file: {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_NAME);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("dv_converter").join("config.yaml"))
            .filter(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<()> {
        for tool in ToolKind::ALL {
            if self.tools.configured(tool).trim().is_empty() {
                return Err(Error::validation(format!(
                    "Tool path for '{}' must not be empty",
                    tool
                )));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::validation(format!(
                "Invalid log level '{}' (expected one of: {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        if self.workspace.temp_root.trim().is_empty() {
            return Err(Error::validation("workspace.temp_root must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        match config.validate() {
            Ok(()) => {}
            Err(e) => panic!("Config validation failed: {}", e),
        }

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tools.mkvmerge = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_string() {
        let yaml = r#"
tools:
  dovi_tool: "/opt/dovi/dovi_tool"
  analyzer: "hdranalyze"

logging:
  level: "debug"
  show_timestamps: false
  colored_output: true

workspace:
  temp_root: "/var/tmp"
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.show_timestamps);
        assert_eq!(config.tools.dovi_tool, "/opt/dovi/dovi_tool");
        assert_eq!(config.tools.analyzer, "hdranalyze");
        assert_eq!(config.tools.ffmpeg, "ffmpeg");
        assert_eq!(config.workspace.temp_root, "/var/tmp");
        assert_eq!(config.workspace.temp_prefix, "dv_converter_temp_");
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let config = Config::from_yaml(include_str!("../../dv_converter.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_explicit_missing_path_fails() {
        let result = Config::load_with_fallback(Some(Path::new("/nonexistent/dv.yaml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
