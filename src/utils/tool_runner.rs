use crate::config::{ToolKind, ToolsConfig};
use crate::utils::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, error, info};

/// One invocation of an external tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub args: Vec<String>,
    /// Mirror the tool's own output (progress lines) to the terminal.
    pub mirror: bool,
}

impl ToolInvocation {
    pub fn new<I, S>(tool: ToolKind, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool,
            args: args.into_iter().map(Into::into).collect(),
            mirror: false,
        }
    }

    pub fn mirrored(mut self) -> Self {
        self.mirror = true;
        self
    }

    pub fn command_line(&self) -> String {
        format!("{} {}", self.tool, self.args.join(" "))
    }

    /// Value following the first of `flags` in the argument list.
    pub fn flag_value(&self, flags: &[&str]) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| flags.contains(&arg.as_str()))
            .and_then(|idx| self.args.get(idx + 1))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub log_path: PathBuf,
}

impl ToolOutcome {
    /// Reads back the step log, empty if it cannot be read.
    pub fn log_text(&self) -> String {
        std::fs::read_to_string(&self.log_path).unwrap_or_default()
    }
}

/// Captured stdout of a short probe command.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub success: bool,
    pub stdout: String,
}

/// Boundary between the conversion logic and the external binaries.
///
/// `run` is for pipeline steps whose output goes to a per-step log file;
/// `capture` is for probes whose stdout is parsed. Both return `Err` only when
/// the process cannot be started at all.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, invocation: &ToolInvocation, log_path: &Path) -> Result<ToolOutcome>;

    async fn capture(&self, tool: ToolKind, args: &[String]) -> Result<CapturedOutput>;
}

/// Resolved executable locations for every tool.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    resolved: HashMap<ToolKind, PathBuf>,
    configured: ToolsConfig,
}

impl ToolPaths {
    pub fn resolve(config: &ToolsConfig) -> Self {
        let mut resolved = HashMap::new();
        for tool in ToolKind::ALL {
            let candidates =
                std::iter::once(config.configured(tool)).chain(tool.aliases().iter().copied());
            if let Some(path) = candidates.filter_map(locate_tool).next() {
                debug!("Resolved {} -> {}", tool, path.display());
                resolved.insert(tool, path);
            }
        }

        Self {
            resolved,
            configured: config.clone(),
        }
    }

    pub fn is_available(&self, tool: ToolKind) -> bool {
        self.resolved.contains_key(&tool)
    }

    /// Located path, or the configured name so spawning reports the failure.
    pub fn path(&self, tool: ToolKind) -> PathBuf {
        self.resolved
            .get(&tool)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(self.configured.configured(tool)))
    }

    /// Verifies the tools every conversion needs are present.
    pub fn check_required(&self) -> Result<()> {
        let mut missing = Vec::new();

        for tool in [ToolKind::Ffmpeg, ToolKind::MkvMerge, ToolKind::DoviTool] {
            if !self.is_available(tool) {
                error!("Required command '{}' not found", tool);
                missing.push(tool.to_string());
            }
        }

        if !self.is_available(ToolKind::MediaInfo) && !self.is_available(ToolKind::Ffprobe) {
            error!("Neither 'mediainfo' nor 'ffprobe' found, one is required");
            missing.push("mediainfo|ffprobe".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Dependency(missing.join(", ")))
        }
    }
}

/// Finds a tool in the working directory first, then on `PATH`.
pub fn locate_tool(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let local = Path::new(".").join(name);
    if local.is_file() {
        return Some(local);
    }

    which::which(name).ok()
}

/// Spawns real processes with tokio and streams their output into step logs.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    paths: ToolPaths,
}

impl ProcessRunner {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    fn spinner(invocation: &ToolInvocation) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("Running {}", invocation.tool));
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    async fn forward(log: &mut File, chunk: &[u8], mirror: bool, is_stderr: bool) -> Result<()> {
        let text = String::from_utf8_lossy(chunk).replace('\r', "\n");
        log.write_all(text.as_bytes()).await?;

        if mirror {
            // Terminal gets the raw bytes so carriage-return progress lines redraw in place.
            let written = if is_stderr {
                let mut handle = std::io::stderr();
                handle.write_all(chunk).and_then(|_| handle.flush())
            } else {
                let mut handle = std::io::stdout();
                handle.write_all(chunk).and_then(|_| handle.flush())
            };
            if let Err(e) = written {
                debug!("Failed to mirror tool output: {}", e);
            }
        }

        Ok(())
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation, log_path: &Path) -> Result<ToolOutcome> {
        let program = self.paths.path(invocation.tool);
        debug!("Running: {} {}", program.display(), invocation.args.join(" "));

        let mut log = File::create(log_path).await?;
        log.write_all(
            format!(
                "Running command: {} {}\n",
                program.display(),
                invocation.args.join(" ")
            )
            .as_bytes(),
        )
        .await?;

        let mut child = Command::new(&program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::tool(format!("Failed to start {}: {}", invocation.tool, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::tool("Child stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::tool("Child stderr was not captured"))?;

        let spinner = (!invocation.mirror).then(|| Self::spinner(invocation));

        let mut out_buf = [0u8; 4096];
        let mut err_buf = [0u8; 4096];
        let mut out_open = true;
        let mut err_open = true;

        while out_open || err_open {
            tokio::select! {
                read = stdout.read(&mut out_buf), if out_open => {
                    match read? {
                        0 => out_open = false,
                        n => Self::forward(&mut log, &out_buf[..n], invocation.mirror, false).await?,
                    }
                }
                read = stderr.read(&mut err_buf), if err_open => {
                    match read? {
                        0 => err_open = false,
                        n => Self::forward(&mut log, &err_buf[..n], invocation.mirror, true).await?,
                    }
                }
            }
        }

        let status = child.wait().await?;
        log.flush().await?;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        if status.success() {
            info!("{} finished", invocation.tool);
        }

        Ok(ToolOutcome {
            success: status.success(),
            exit_code: status.code(),
            log_path: log_path.to_path_buf(),
        })
    }

    async fn capture(&self, tool: ToolKind, args: &[String]) -> Result<CapturedOutput> {
        let program = self.paths.path(tool);
        debug!("Probing: {} {}", program.display(), args.join(" "));

        let output = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::tool(format!("Failed to start {}: {}", tool, e)))?;

        Ok(CapturedOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_lookup() {
        let invocation = ToolInvocation::new(
            ToolKind::DoviTool,
            ["generate", "-j", "extra.json", "--rpu-out", "RPU.bin"],
        );
        assert_eq!(invocation.flag_value(&["--rpu-out"]), Some("RPU.bin"));
        assert_eq!(invocation.flag_value(&["-o"]), None);
        assert!(!invocation.mirror);
        assert!(invocation.clone().mirrored().mirror);
    }

    #[test]
    fn test_command_line_rendering() {
        let invocation = ToolInvocation::new(ToolKind::MkvMerge, ["-q", "-o", "out.mkv"]);
        assert_eq!(invocation.command_line(), "mkvmerge -q -o out.mkv");
    }

    #[test]
    fn test_locate_tool_rejects_missing_explicit_path() {
        assert!(locate_tool("/definitely/not/here/dovi_tool").is_none());
    }

    #[test]
    fn test_missing_tools_fail_dependency_check() {
        let config = ToolsConfig {
            ffmpeg: "/nonexistent/ffmpeg".to_string(),
            ffprobe: "/nonexistent/ffprobe".to_string(),
            mediainfo: "/nonexistent/mediainfo".to_string(),
            mkvmerge: "/nonexistent/mkvmerge".to_string(),
            dovi_tool: "/nonexistent/dovi_tool".to_string(),
            hdr10plus_tool: "/nonexistent/hdr10plus_tool".to_string(),
            analyzer: "/nonexistent/hdr_analyzer_mvp".to_string(),
            verifier: "/nonexistent/verifier".to_string(),
        };
        let paths = ToolPaths::resolve(&config);
        assert!(!paths.is_available(ToolKind::Ffmpeg));
        assert_eq!(paths.path(ToolKind::DoviTool), PathBuf::from("/nonexistent/dovi_tool"));
        assert!(matches!(paths.check_required(), Err(Error::Dependency(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_streams_output_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolsConfig {
            ffmpeg: "sh".to_string(),
            ..ToolsConfig::default()
        };
        let runner = ProcessRunner::new(ToolPaths::resolve(&config));
        let log = dir.path().join("step.log");
        let invocation = ToolInvocation::new(
            ToolKind::Ffmpeg,
            ["-c", "printf 'frame=1\\rframe=2\\n'; echo oops >&2; exit 3"],
        );

        let outcome = runner.run(&invocation, &log).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));

        let text = outcome.log_text();
        assert!(text.contains("frame=1\nframe=2"));
        assert!(text.contains("oops"));
    }
}
