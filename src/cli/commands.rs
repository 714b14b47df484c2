use crate::{
    cli::CliArgs,
    config::ToolKind,
    utils::{tool_runner::ToolPaths, Result},
};

/// Runs informational commands. Returns `true` when one ran and the program
/// should exit without converting anything.
pub fn handle_commands(args: &CliArgs, paths: &ToolPaths) -> Result<bool> {
    if args.check_tools {
        check_tools(paths)?;
        return Ok(true);
    }

    Ok(false)
}

fn tool_role(tool: ToolKind) -> &'static str {
    match tool {
        ToolKind::Ffmpeg | ToolKind::MkvMerge | ToolKind::DoviTool => "required",
        ToolKind::MediaInfo | ToolKind::Ffprobe => "required (either)",
        ToolKind::Hdr10PlusTool => "HDR10+ sources",
        ToolKind::Analyzer => "HDR10 without measurements, HLG",
        ToolKind::Verifier => "--verify",
    }
}

fn check_tools(paths: &ToolPaths) -> Result<()> {
    println!("External tools:");
    println!("{:-<72}", "");

    for tool in ToolKind::ALL {
        if paths.is_available(tool) {
            println!(
                "✓ {:<16} {:<34} {}",
                tool.as_str(),
                tool_role(tool),
                paths.path(tool).display()
            );
        } else {
            println!("✗ {:<16} {:<34} not found", tool.as_str(), tool_role(tool));
        }
    }
    println!();

    match paths.check_required() {
        Ok(()) => {
            println!("✓ All required tools are available");
            Ok(())
        }
        Err(e) => {
            println!("✗ {}", e);
            Err(e)
        }
    }
}
