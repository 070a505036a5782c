use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{CHECKPOINT_SUFFIX, DEFAULT_OUTPUT_DIR, RESULTS_FILE_PREFIX};

/// Generate default results filename with format: output/route_analysis_{YYYYMMDD_HHMMSS}.json
pub fn generate_default_results_filename() -> PathBuf {
    default_results_filename_in(Path::new(DEFAULT_OUTPUT_DIR))
}

pub fn default_results_filename_in(dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}.json", RESULTS_FILE_PREFIX, timestamp))
}

/// Checkpoint file that sits next to a results file: `foo.json` -> `foo_checkpoint.json`
pub fn checkpoint_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| RESULTS_FILE_PREFIX.to_string());
    let extension = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());

    output.with_file_name(format!("{}{}.{}", stem, CHECKPOINT_SUFFIX, extension))
}

/// Inverse of [`checkpoint_path_for`] for `.json` checkpoints
pub fn results_path_for_checkpoint(checkpoint: &Path) -> Option<PathBuf> {
    let name = checkpoint.file_name()?.to_str()?;
    let stem = name.strip_suffix(&format!("{}.json", CHECKPOINT_SUFFIX))?;
    if stem.is_empty() {
        return None;
    }
    Some(checkpoint.with_file_name(format!("{}.json", stem)))
}

/// `route_analysis_*_checkpoint.json` files under `dir`, most recently modified first
pub fn find_checkpoints(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}_*{}.json",
        glob::Pattern::escape(&dir.to_string_lossy()),
        RESULTS_FILE_PREFIX,
        CHECKPOINT_SUFFIX
    );

    let entries = glob::glob(&pattern)
        .map_err(|e| ProcessingError::Config(format!("bad checkpoint pattern '{}': {}", pattern, e)))?;

    let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                found.push((modified, path));
            }
            Err(e) => warn!("Skipping unreadable checkpoint candidate: {}", e),
        }
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}
