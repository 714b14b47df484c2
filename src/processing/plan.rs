use crate::config::{ConversionSettings, OptimizerProfile};
use crate::dolby_vision::{DoviTool, RpuParameters};
use crate::hdr::types::{HdrVariant, StaticMetadata, TrimTargets};
use crate::hdr10plus::Hdr10PlusTool;
use crate::measurements::{analyze, measurements_output_path, AnalyzerOptions};
use crate::mkvmerge::{MkvMergeTool, MuxOptions};
use crate::utils::ffmpeg::{extract_hevc, hlg_to_pq, HlgToPqOptions};
use crate::utils::filesystem::file_stem;
use crate::utils::tool_runner::ToolInvocation;
use crate::utils::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How a classified file is turned into Dolby Vision.
///
/// `ReuseMeasurements` and `SynthesizeMeasurements` are the two cases of an
/// HDR10 file without dynamic metadata: either a measurements file was found
/// next to it, or the analyzer has to produce one.
#[derive(Debug, Clone, PartialEq)]
pub enum Branch {
    Hdr10Plus,
    Hdr10WithMeasurements { measurements: PathBuf },
    ReuseMeasurements { measurements: PathBuf },
    SynthesizeMeasurements,
    Hlg,
}

impl Branch {
    pub fn resolve(
        variant: HdrVariant,
        discovered: Option<&Path>,
        settings: &ConversionSettings,
    ) -> Result<Self> {
        match variant {
            HdrVariant::Hdr10Plus => Ok(Self::Hdr10Plus),
            HdrVariant::Hdr10WithMeasurements => discovered
                .map(|m| Self::Hdr10WithMeasurements {
                    measurements: m.to_path_buf(),
                })
                .ok_or_else(|| Error::missing_artifact("Expected madVR measurements file not found")),
            HdrVariant::Hdr10Unsupported => match discovered {
                Some(measurements) => {
                    if settings.boost_experimental {
                        warn!("Experimental boost requested, but using existing measurements");
                    }
                    Ok(Self::ReuseMeasurements {
                        measurements: measurements.to_path_buf(),
                    })
                }
                None => Ok(Self::SynthesizeMeasurements),
            },
            HdrVariant::Hlg => Ok(Self::Hlg),
            HdrVariant::Unsupported => Err(Error::unsupported_format(
                "no HDR10, HDR10+ or HLG signal found",
            )),
        }
    }

    /// Measurements file the RPU is generated from, if any.
    pub fn measurements(&self, input: &Path) -> Option<PathBuf> {
        match self {
            Self::Hdr10Plus => None,
            Self::Hdr10WithMeasurements { measurements }
            | Self::ReuseMeasurements { measurements } => Some(measurements.clone()),
            Self::SynthesizeMeasurements | Self::Hlg => Some(measurements_output_path(input)),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hdr10Plus => "HDR10+ dynamic metadata",
            Self::Hdr10WithMeasurements { .. } => "HDR10 with measurements",
            Self::ReuseMeasurements { .. } => "HDR10, reusing measurements",
            Self::SynthesizeMeasurements => "HDR10, generating measurements",
            Self::Hlg => "HLG, generating measurements",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepId {
    ExtractSourceStream,
    ExtractDynamicMetadata,
    GenerateMeasurements,
    ConvertHlgToPq,
    WriteRpuParameters,
    GenerateRpu,
    ExtractBaseLayer,
    InjectRpu,
    Mux,
    CopyTimestamps,
}

impl StepId {
    pub fn description(&self) -> &'static str {
        match self {
            Self::ExtractSourceStream => "Extracting HEVC stream",
            Self::ExtractDynamicMetadata => "Extracting HDR10+ metadata",
            Self::GenerateMeasurements => "Generating measurements",
            Self::ConvertHlgToPq => "Converting HLG to PQ",
            Self::WriteRpuParameters => "Writing RPU parameters",
            Self::GenerateRpu => "Generating RPU",
            Self::ExtractBaseLayer => "Extracting BL to HEVC",
            Self::InjectRpu => "Injecting RPU",
            Self::Mux => "Muxing final MKV",
            Self::CopyTimestamps => "Copying source timestamps",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    External {
        invocation: ToolInvocation,
        log: PathBuf,
        /// Must exist and be non-empty after the tool succeeds.
        output: PathBuf,
    },
    WriteRpuParameters {
        parameters: RpuParameters,
        path: PathBuf,
    },
    CopyTimestamps {
        source: PathBuf,
        target: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub id: StepId,
    pub action: StepAction,
}

/// Where `dovi_tool generate` reads its dynamic metadata from.
#[derive(Debug, Clone, PartialEq)]
pub enum RpuSource {
    DynamicMetadata(PathBuf),
    Measurements(PathBuf),
}

/// Everything a plan needs to know about one input file.
#[derive(Debug, Clone)]
pub struct PlanContext<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub temp_dir: &'a Path,
    pub metadata: &'a StaticMetadata,
    pub trims: &'a TrimTargets,
    pub settings: &'a ConversionSettings,
}

/// Ordered steps that turn one input into its Dolby Vision output.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionPlan {
    branch: Branch,
    steps: Vec<PlanStep>,
    measurements: Option<PathBuf>,
    output: PathBuf,
}

impl ConversionPlan {
    pub fn build(branch: Branch, ctx: &PlanContext<'_>) -> Self {
        let mut builder = PlanBuilder {
            ctx,
            steps: Vec::new(),
        };

        let rpu_source = match &branch {
            Branch::Hdr10Plus => builder.dynamic_metadata_steps(),
            Branch::Hdr10WithMeasurements { measurements }
            | Branch::ReuseMeasurements { measurements } => {
                RpuSource::Measurements(measurements.clone())
            }
            Branch::SynthesizeMeasurements => builder.analyzer_step(false),
            Branch::Hlg => builder.analyzer_step(true),
        };

        let base_layer_source = match &branch {
            Branch::Hlg => builder.hlg_conversion_step(),
            _ => ctx.input.to_path_buf(),
        };

        builder.common_tail(&rpu_source, &base_layer_source);

        let measurements = branch.measurements(ctx.input);
        info!("Conversion plan: {} ({} steps)", branch, builder.steps.len());

        Self {
            branch,
            steps: builder.steps,
            measurements,
            output: ctx.output.to_path_buf(),
        }
    }

    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn measurements(&self) -> Option<&Path> {
        self.measurements.as_deref()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

struct PlanBuilder<'c, 'a> {
    ctx: &'c PlanContext<'a>,
    steps: Vec<PlanStep>,
}

impl PlanBuilder<'_, '_> {
    fn temp(&self, name: &str) -> PathBuf {
        self.ctx.temp_dir.join(name)
    }

    fn external(&mut self, id: StepId, invocation: ToolInvocation, log: &str, output: PathBuf) {
        let log = self.temp(log);
        self.steps.push(PlanStep {
            id,
            action: StepAction::External {
                invocation,
                log,
                output,
            },
        });
    }

    fn dynamic_metadata_steps(&mut self) -> RpuSource {
        let hevc = self.temp("video.hevc");
        let json = self.temp("hdr10plus_metadata.json");

        self.external(
            StepId::ExtractSourceStream,
            extract_hevc(self.ctx.input, &hevc),
            "ffmpeg_extract_video.log",
            hevc.clone(),
        );
        self.external(
            StepId::ExtractDynamicMetadata,
            Hdr10PlusTool::extract(&hevc, &json),
            "hdr10plus_extract.log",
            json.clone(),
        );

        RpuSource::DynamicMetadata(json)
    }

    fn analyzer_step(&mut self, hlg: bool) -> RpuSource {
        let settings = self.ctx.settings;
        let optimizer_profile = if settings.boost_experimental {
            info!("Experimental boost: using 'aggressive' optimizer");
            OptimizerProfile::Aggressive
        } else {
            settings.optimizer_profile
        };
        let options = AnalyzerOptions {
            optimizer_profile,
            hwaccel: settings.hwaccel,
            hlg_peak_nits: hlg.then_some(settings.hlg_peak_nits),
        };

        let output = measurements_output_path(self.ctx.input);
        self.external(
            StepId::GenerateMeasurements,
            analyze(self.ctx.input, &output, &options),
            "analyzer.log",
            output.clone(),
        );

        RpuSource::Measurements(output)
    }

    fn hlg_conversion_step(&mut self) -> PathBuf {
        let settings = self.ctx.settings;
        let options = HlgToPqOptions {
            peak_nits: settings.hlg_peak_nits,
            crf: settings.hlg_crf,
            preset: settings.hlg_preset.clone(),
            hwaccel: settings.hwaccel,
        };
        let output = self.temp(&format!("{}_HLG_to_PQ.mkv", file_stem(self.ctx.input)));

        self.external(
            StepId::ConvertHlgToPq,
            hlg_to_pq(self.ctx.input, &output, &options, self.ctx.metadata),
            "ffmpeg_hlg_to_pq.log",
            output.clone(),
        );
        output
    }

    fn common_tail(&mut self, rpu_source: &RpuSource, base_layer_source: &Path) {
        let ctx = self.ctx;
        let extra_json = self.temp("extra.json");
        let rpu = self.temp("RPU.bin");
        let base_layer = self.temp("BL.hevc");
        let base_layer_rpu = self.temp("BL_RPU.hevc");

        self.steps.push(PlanStep {
            id: StepId::WriteRpuParameters,
            action: StepAction::WriteRpuParameters {
                parameters: RpuParameters::new(ctx.metadata, ctx.trims),
                path: extra_json.clone(),
            },
        });

        let generate = match rpu_source {
            RpuSource::DynamicMetadata(json) => DoviTool::generate_from_hdr10plus(
                &extra_json,
                json,
                ctx.settings.peak_source,
                &rpu,
            ),
            RpuSource::Measurements(measurements) => {
                DoviTool::generate_from_measurements(&extra_json, measurements, &rpu)
            }
        };
        self.external(StepId::GenerateRpu, generate, "dovi_generate.log", rpu.clone());

        self.external(
            StepId::ExtractBaseLayer,
            extract_hevc(base_layer_source, &base_layer),
            "ffmpeg_extract_bl.log",
            base_layer.clone(),
        );
        self.external(
            StepId::InjectRpu,
            DoviTool::inject_rpu(&base_layer, &rpu, &base_layer_rpu),
            "dovi_inject.log",
            base_layer_rpu.clone(),
        );
        self.external(
            StepId::Mux,
            MkvMergeTool::remux_with_source(
                &base_layer_rpu,
                ctx.input,
                ctx.output,
                MuxOptions {
                    drop_chapters: ctx.settings.drop_chapters,
                    drop_tags: ctx.settings.drop_tags,
                },
            ),
            "mkvmerge.log",
            ctx.output.to_path_buf(),
        );

        self.steps.push(PlanStep {
            id: StepId::CopyTimestamps,
            action: StepAction::CopyTimestamps {
                source: ctx.input.to_path_buf(),
                target: ctx.output.to_path_buf(),
            },
        });
    }
}
