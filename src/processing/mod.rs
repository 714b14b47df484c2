pub mod executor;
pub mod plan;

pub use executor::{PlanExecutor, PlanOutcome};
pub use plan::{Branch, ConversionPlan, PlanContext, PlanStep, RpuSource, StepAction, StepId};

use crate::config::{ConversionSettings, WorkspaceConfig};
use crate::hdr::types::HdrVariant;
use crate::hdr::{
    resolve_trim_targets, validate_static_metadata, FormatClassifier, MetadataCache,
    MetadataExtractor,
};
use crate::utils::filesystem::{
    file_name, find_details_file, find_measurements_file, output_path_for, sanitize_name,
};
use crate::utils::tool_runner::CommandRunner;
use crate::utils::{Error, Result};
use crate::verify::PostMuxVerifier;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Per-run scratch directory holding one subdirectory per input file.
pub struct Workspace {
    root: TempDir,
}

impl Workspace {
    pub fn create(config: &WorkspaceConfig, keep: bool) -> Result<Self> {
        std::fs::create_dir_all(&config.temp_root)?;
        let root = tempfile::Builder::new()
            .prefix(&config.temp_prefix)
            .keep(keep)
            .tempdir_in(&config.temp_root)?;
        debug!("Workspace: {}", root.path().display());
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn file_dir(&self, input: &Path) -> Result<PathBuf> {
        let dir = self.root.path().join(sanitize_name(&file_name(input)));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Converted(PathBuf),
    /// The output already existed.
    Skipped(PathBuf),
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn log(&self) {
        info!(
            "Batch complete: {} converted, {} skipped, {} failed",
            self.converted,
            self.skipped,
            self.failed.len()
        );
        for (path, reason) in &self.failed {
            error!("Failed: {} ({})", path.display(), reason);
        }
    }
}

/// Drives the conversion of input files, one at a time.
pub struct Converter<'a, R: CommandRunner> {
    runner: &'a R,
    settings: ConversionSettings,
    cache: MetadataCache,
    workspace: Workspace,
}

impl<'a, R: CommandRunner> Converter<'a, R> {
    pub fn new(runner: &'a R, settings: ConversionSettings, workspace: Workspace) -> Self {
        Self {
            runner,
            settings,
            cache: MetadataCache::new(),
            workspace,
        }
    }

    pub async fn convert_batch(&self, files: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (index, file) in files.iter().enumerate() {
            info!("[{}/{}] {}", index + 1, files.len(), file.display());
            match self.convert_file(file).await {
                Ok(FileOutcome::Converted(_)) => summary.converted += 1,
                Ok(FileOutcome::Skipped(_)) => summary.skipped += 1,
                Err(e) => {
                    error!("Conversion failed for {}: {}", file.display(), e);
                    summary.failed.push((file.clone(), e.to_string()));
                }
            }
        }

        summary.log();
        summary
    }

    pub async fn convert_file(&self, input: &Path) -> Result<FileOutcome> {
        let output = output_path_for(input);
        if output.exists() {
            warn!("Output file {} already exists, skipping", output.display());
            return Ok(FileOutcome::Skipped(output));
        }
        if !input.is_file() {
            return Err(Error::missing_artifact(format!(
                "Input file not found: {}",
                input.display()
            )));
        }

        info!("Processing file: {}", input.display());

        match self.produce(input, &output).await {
            Ok(()) => {
                info!("Success! Created: {}", file_name(&output));
                Ok(FileOutcome::Converted(output))
            }
            Err(e) => {
                // The output did not exist before this run.
                discard_output(&output);
                Err(e)
            }
        }
    }

    async fn produce(&self, input: &Path, output: &Path) -> Result<()> {
        let classification = FormatClassifier::new(self.runner, &self.cache)
            .classify(input)
            .await;
        if classification.variant == HdrVariant::Unsupported {
            let raw = if classification.raw_probe.is_empty() {
                "/"
            } else {
                classification.raw_probe.as_str()
            };
            error!("Unsupported HDR format (mediainfo reported '{}')", raw);
        }
        let mut branch = Branch::resolve(
            classification.variant,
            classification.measurements.as_deref(),
            &self.settings,
        )?;

        let details = find_details_file(input);
        if let Some(details) = &details {
            info!("Found calibration log: {}", details.display());
        }
        let metadata = MetadataExtractor::new(self.runner, &self.cache)
            .extract(input, details.as_deref())
            .await;
        validate_static_metadata(&metadata).log(&file_name(input));
        let trims = resolve_trim_targets(
            details.as_deref(),
            self.settings.trim_from_details,
            &self.settings.trim_targets,
        );

        let temp_dir = self.workspace.file_dir(input)?;
        let context = PlanContext {
            input,
            output,
            temp_dir: &temp_dir,
            metadata: &metadata,
            trims: &trims,
            settings: &self.settings,
        };
        let executor = PlanExecutor::new(self.runner);

        let plan = loop {
            let plan = ConversionPlan::build(branch, &context);
            match executor.execute(&plan).await? {
                PlanOutcome::Completed => break plan,
                PlanOutcome::NoDynamicMetadata => {
                    warn!("HDR10+ tagged but no dynamic metadata found, falling back to HDR10 analysis");
                    let found = find_measurements_file(input);
                    branch = Branch::resolve(
                        HdrVariant::Hdr10Unsupported,
                        found.as_deref(),
                        &self.settings,
                    )?;
                }
            }
        };

        if self.settings.verify {
            let report = PostMuxVerifier::new(self.runner, &self.cache)
                .verify(output, plan.measurements(), &temp_dir)
                .await;
            if !report.passed() {
                return Err(Error::verification(format!(
                    "inconsistencies detected in {}",
                    output.display()
                )));
            }
        }

        if !self.settings.keep_source {
            let measurements = plan
                .measurements()
                .map(Path::to_path_buf)
                .or_else(|| find_measurements_file(input));
            self.clean_up(input, measurements.as_deref(), details.as_deref(), &temp_dir);
        }

        Ok(())
    }

    fn clean_up(&self, input: &Path, measurements: Option<&Path>, details: Option<&Path>, temp_dir: &Path) {
        info!("Cleaning up...");
        let files = std::iter::once(input).chain(measurements).chain(details);
        for file in files {
            match std::fs::remove_file(file) {
                Ok(()) => debug!("Removed {}", file.display()),
                Err(e) => warn!("Could not remove {}: {}", file.display(), e),
            }
        }
        if let Err(e) = std::fs::remove_dir_all(temp_dir) {
            warn!("Could not remove {}: {}", temp_dir.display(), e);
        }
    }
}

fn discard_output(output: &Path) {
    if output.exists() {
        match std::fs::remove_file(output) {
            Ok(()) => info!("Removed incomplete output {}", output.display()),
            Err(e) => warn!("Could not remove incomplete output {}: {}", output.display(), e),
        }
    }
}
