use super::plan::{ConversionPlan, PlanStep, StepAction, StepId};
use crate::hdr10plus::Hdr10PlusTool;
use crate::utils::filesystem::{copy_file_times, format_file_size};
use crate::utils::tool_runner::{CommandRunner, ToolInvocation, ToolOutcome};
use crate::utils::{Error, Result};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// How a plan run ended when no step failed hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanOutcome {
    Completed,
    /// The stream is tagged HDR10+ but carries no dynamic metadata; the file
    /// has to go through the HDR10 path instead.
    NoDynamicMetadata,
}

pub struct PlanExecutor<'a, R: CommandRunner> {
    runner: &'a R,
}

impl<'a, R: CommandRunner> PlanExecutor<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, plan: &ConversionPlan) -> Result<PlanOutcome> {
        for step in plan.steps() {
            info!("{}...", step.id);
            if let Some(outcome) = self.run_step(step).await? {
                return Ok(outcome);
            }
        }
        Ok(PlanOutcome::Completed)
    }

    /// `Some` ends the plan early without an error.
    async fn run_step(&self, step: &PlanStep) -> Result<Option<PlanOutcome>> {
        match &step.action {
            StepAction::External {
                invocation,
                log,
                output,
            } => {
                let outcome = self.runner.run(invocation, log).await?;

                if step.id == StepId::ExtractDynamicMetadata
                    && Hdr10PlusTool::reports_no_dynamic_metadata(&outcome.log_text())
                {
                    return Ok(Some(PlanOutcome::NoDynamicMetadata));
                }

                if !outcome.success {
                    surface_log(invocation, &outcome);
                    return Err(Error::tool_failed(invocation.tool.as_str(), outcome.log_path));
                }
                check_output(step.id, output)?;
            }
            StepAction::WriteRpuParameters { parameters, path } => parameters.write_to(path)?,
            StepAction::CopyTimestamps { source, target } => {
                if let Err(e) = copy_file_times(source, target) {
                    warn!("Could not copy timestamps to {}: {}", target.display(), e);
                }
            }
        }
        Ok(None)
    }
}

fn check_output(id: StepId, output: &Path) -> Result<()> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => {
            debug!("{} -> {} ({})", id, output.display(), format_file_size(meta.len()));
            Ok(())
        }
        _ => Err(Error::missing_artifact(format!(
            "{} produced no output at {}",
            id,
            output.display()
        ))),
    }
}

fn surface_log(invocation: &ToolInvocation, outcome: &ToolOutcome) {
    error!(
        "{} failed with exit code {}",
        invocation.tool,
        outcome
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    error!("Log file: {}", outcome.log_path.display());
    for line in outcome.log_text().lines().filter(|l| !l.trim().is_empty()) {
        error!("  {}", line);
    }
}
