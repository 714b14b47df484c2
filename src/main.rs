use clap::Parser;
use tracing::{error, info, warn};

use dv_converter::{
    cli::{handle_commands, CliArgs},
    config::Config,
    processing::{Converter, Workspace},
    utils::{collect_inputs, setup_logging, ProcessRunner, Result, ToolPaths},
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<i32> {
    let args = CliArgs::parse();
    let config = Config::load_with_fallback(args.config.as_deref())?;

    setup_logging(
        args.get_log_level(&config.logging.level),
        config.logging.show_timestamps,
        config.logging.colored_output,
    )?;

    let paths = ToolPaths::resolve(&config.tools);
    if handle_commands(&args, &paths)? {
        return Ok(0);
    }

    // Checked after parsing so --help and --version work without the tools.
    paths.check_required()?;
    let settings = args.conversion_settings()?;

    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        warn!("No MKV files found to convert");
        return Ok(0);
    }
    info!("Found {} file(s) to convert", files.len());

    let runner = ProcessRunner::new(paths);
    let workspace = Workspace::create(&config.workspace, settings.keep_source)?;
    if settings.keep_source {
        info!("Temporary files are kept in {}", workspace.path().display());
    }

    let converter = Converter::new(&runner, settings, workspace);
    let summary = converter.convert_batch(&files).await;
    Ok(summary.exit_code())
}
