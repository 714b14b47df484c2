use crate::utils::{Error, Result};
use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const INPUT_EXTENSION: &str = "mkv";
const OUTPUT_SUFFIX: &str = ".DV.mkv";

/// Expands the command-line inputs into the list of files to convert.
///
/// Directories are searched recursively for `.mkv` files; with no inputs at
/// all, the `.mkv` files of the working directory are used. Previous outputs
/// (`*.DV.mkv`) are never treated as inputs.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        let mut files: Vec<PathBuf> = WalkDir::new(".")
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_mkv_file(p) && !is_converted_output(p))
            .collect();
        files.sort();
        return Ok(files);
    }

    let mut files = Vec::new();
    for input in inputs {
        files.extend(find_video_files(input)?);
    }
    Ok(files)
}

pub fn find_video_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::validation(format!(
            "Path does not exist: {}",
            path.display()
        )));
    }

    let mut video_files = Vec::new();

    if path.is_file() {
        video_files.push(path.to_path_buf());
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_mkv_file(path) && !is_converted_output(path) {
                video_files.push(path.to_path_buf());
            }
        }

        if video_files.is_empty() {
            return Err(Error::validation(format!(
                "No .mkv files found in directory: {}",
                path.display()
            )));
        }

        video_files.sort();
    }

    Ok(video_files)
}

pub fn is_mkv_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(INPUT_EXTENSION))
        .unwrap_or(false)
}

pub fn is_converted_output<P: AsRef<Path>>(path: P) -> bool {
    file_name(path.as_ref()).ends_with(OUTPUT_SUFFIX)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<dir>/<stem>.DV.mkv`
pub fn output_path_for(input: &Path) -> PathBuf {
    parent_dir(input).join(format!("{}{}", file_stem(input), OUTPUT_SUFFIX))
}

/// Replaces everything except ASCII alphanumerics with `_`.
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Siblings of `input` whose name ends with `suffix` and starts with the
/// input's stem. Only a single unambiguous match is returned.
fn unique_sibling(input: &Path, suffix: &str) -> Option<PathBuf> {
    let stem = file_stem(input);
    let matches: Vec<PathBuf> = WalkDir::new(parent_dir(input))
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name = file_name(p);
            name.ends_with(suffix) && name.starts_with(&stem)
        })
        .collect();

    match matches.as_slice() {
        [single] => Some(single.clone()),
        _ => None,
    }
}

/// Locates the madVR measurements file belonging to `input`.
pub fn find_measurements_file(input: &Path) -> Option<PathBuf> {
    let dir = parent_dir(input);
    let name = file_name(input);
    let stem = file_stem(input);

    let candidates = [
        dir.join("measurements.bin"),
        dir.join(format!("{}.measurements", name)),
        dir.join(format!("{}.measurements", stem)),
        dir.join(format!("{}_measurements.bin", stem)),
    ];

    candidates
        .into_iter()
        .find(|c| c.is_file())
        .or_else(|| unique_sibling(input, ".measurements"))
        .or_else(|| unique_sibling(input, "_measurements.bin"))
}

/// Locates the madVR `Details.txt` calibration log belonging to `input`.
pub fn find_details_file(input: &Path) -> Option<PathBuf> {
    let dir = parent_dir(input);
    let stem = file_stem(input);

    [
        dir.join(format!("{}_mkv_Details.txt", stem)),
        dir.join(format!("{}_Details.txt", stem)),
    ]
    .into_iter()
    .find(|c| c.is_file())
    .or_else(|| unique_sibling(input, "_mkv_Details.txt"))
}

/// Copies access/modification times and permissions from `source` to `target`.
pub fn copy_file_times(source: &Path, target: &Path) -> Result<()> {
    let metadata = std::fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);

    let file = std::fs::OpenOptions::new().write(true).open(target)?;
    file.set_times(times)?;
    std::fs::set_permissions(target, metadata.permissions())?;
    Ok(())
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let size = bytes as f64;
    let unit_index = (size.log(THRESHOLD) as usize).min(UNITS.len() - 1);
    let size_in_unit = size / THRESHOLD.powi(unit_index as i32);

    format!("{:.2} {}", size_in_unit, UNITS[unit_index])
}
