use crate::config::ToolKind;
use crate::utils::tool_runner::ToolInvocation;
use std::path::Path;

/// Which parts of the source container are left out of the remux.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxOptions {
    pub drop_chapters: bool,
    pub drop_tags: bool,
}

pub struct MkvMergeTool;

impl MkvMergeTool {
    /// Remux raw HEVC+RPU bitstream with streams from original MKV
    ///
    /// The video comes from `hevc_file`; audio, subtitles, attachments and
    /// (unless dropped) chapters and global tags come from `source_mkv`.
    pub fn remux_with_source(
        hevc_file: &Path,
        source_mkv: &Path,
        output_mkv: &Path,
        options: MuxOptions,
    ) -> ToolInvocation {
        let mut args = vec![
            "-q".to_string(),
            "-o".to_string(),
            output_mkv.display().to_string(),
        ];
        if options.drop_tags {
            args.push("--no-global-tags".to_string());
        }
        if options.drop_chapters {
            args.push("--no-chapters".to_string());
        }
        args.push(hevc_file.display().to_string());
        args.push("--no-video".to_string());
        args.push(source_mkv.display().to_string());

        ToolInvocation::new(ToolKind::MkvMerge, args)
    }
}
