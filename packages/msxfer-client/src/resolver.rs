//! Input resolution: expand user-supplied file and directory arguments
//! into a canonical, sorted, deduplicated list of eligible files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::ClientError;

const SUPPORTED_EXTENSIONS: &[&str] = &["mzml", "msz", "mszx"];

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve `paths` into a sorted, deduplicated list of eligible input
/// files. Directories are scanned one level deep unless `recursive` is
/// set, in which case every depth is scanned. Arguments that are neither
/// an eligible file nor a directory are logged and skipped, matching the
/// original's `resolve_inputs` behavior — but extension matching here is
/// genuinely case-insensitive rather than enumerating glob patterns.
pub fn resolve_inputs(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>, ClientError> {
    let mut resolved = BTreeSet::new();

    for path in paths {
        if path.is_file() {
            if has_supported_extension(path) {
                match path.canonicalize() {
                    Ok(canonical) => {
                        resolved.insert(canonical);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to canonicalize path"),
                }
            } else {
                warn!(path = %path.display(), "skipping unsupported file");
            }
        } else if path.is_dir() {
            collect_dir(path, recursive, &mut resolved);
        } else {
            warn!(path = %path.display(), "path does not exist");
        }
    }

    if resolved.is_empty() {
        return Err(ClientError::NoEligibleInputs);
    }

    Ok(resolved.into_iter().collect())
}

fn collect_dir(dir: &Path, recursive: bool, out: &mut BTreeSet<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to read directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_dir(&path, recursive, out);
            }
            continue;
        }
        if has_supported_extension(&path) {
            if let Ok(canonical) = path.canonicalize() {
                out.insert(canonical);
            }
        }
    }
}
