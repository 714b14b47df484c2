use crate::config::{HwAccel, ToolKind};
use crate::hdr::types::StaticMetadata;
use crate::utils::tool_runner::ToolInvocation;
use std::path::Path;

/// BT.2020 primaries and D65 white point in x265 master-display units.
const BT2020_PRIMARIES: &str = "G(8500,39850)B(6550,2300)R(35400,14600)WP(15635,16450)";

/// Settings for re-encoding an HLG source into a PQ base layer.
#[derive(Debug, Clone, PartialEq)]
pub struct HlgToPqOptions {
    pub peak_nits: u32,
    pub crf: u8,
    pub preset: String,
    pub hwaccel: HwAccel,
}

/// Copies the first video stream into a raw HEVC elementary stream.
pub fn extract_hevc(source: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new(
        ToolKind::Ffmpeg,
        [
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-stats".to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-y".to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-f".to_string(),
            "hevc".to_string(),
            output.display().to_string(),
        ],
    )
    .mirrored()
}

/// Re-encodes the first video stream from ARIB STD-B67 to SMPTE ST 2084,
/// writing HDR10 static metadata into the stream.
pub fn hlg_to_pq(
    source: &Path,
    output: &Path,
    options: &HlgToPqOptions,
    metadata: &StaticMetadata,
) -> ToolInvocation {
    let filter = format!(
        "zscale=transferin=arib-std-b67:transfer=smpte2084:primaries=bt2020:matrix=bt2020nc:rangein=tv:range=tv:npl={},format=yuv420p10le",
        options.peak_nits
    );

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-stats".into(),
        "-y".into(),
    ];
    if options.hwaccel == HwAccel::Cuda {
        args.extend(["-hwaccel".into(), "cuda".into()]);
    }
    args.extend([
        "-i".into(),
        source.display().to_string(),
        "-map".into(),
        "0:v:0".into(),
        "-vf".into(),
        filter,
    ]);

    match options.hwaccel {
        HwAccel::Cuda => args.extend(
            [
                "-c:v",
                "hevc_nvenc",
                "-preset",
                "p7",
                "-tune",
                "hq",
                "-rc",
                "constqp",
                "-qp",
                "19",
                "-profile:v",
                "main10",
                "-pix_fmt",
                "p010le",
                "-color_primaries",
                "bt2020",
                "-color_trc",
                "smpte2084",
                "-colorspace",
                "bt2020nc",
            ]
            .map(String::from),
        ),
        HwAccel::None => {
            args.extend([
                "-c:v".into(),
                "libx265".into(),
                "-preset".into(),
                options.preset.clone(),
                "-crf".into(),
                options.crf.to_string(),
                "-pix_fmt".into(),
                "yuv420p10le".into(),
                "-profile:v".into(),
                "main10".into(),
                "-x265-params".into(),
                x265_hdr10_params(metadata),
            ]);
        }
    }

    args.extend(["-an".into(), "-sn".into(), output.display().to_string()]);
    ToolInvocation::new(ToolKind::Ffmpeg, args).mirrored()
}

fn x265_hdr10_params(metadata: &StaticMetadata) -> String {
    format!(
        "colorprim=bt2020:transfer=smpte2084:colormatrix=bt2020nc:master-display={}L({},{}):max-cll={},{}:hdr-opt=1:repeat-headers=1",
        BT2020_PRIMARIES,
        metadata.max_display_luminance as u64 * 10000,
        (metadata.min_display_luminance * 10000.0).round() as u64,
        metadata.max_content_light_level,
        metadata.max_frame_average_light_level
    )
}

/// ffprobe arguments that print only the first video stream's color transfer.
pub fn color_transfer_probe_args(source: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-select_streams".into(),
        "v:0".into(),
        "-show_entries".into(),
        "stream=color_transfer".into(),
        "-of".into(),
        "default=nokey=1:noprint_wrappers=1".into(),
        source.display().to_string(),
    ]
}
