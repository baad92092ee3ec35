//! Fragment discovery within a run's input directory
//!
//! Patterns are comma-separated glob fragments; a file matches a pattern
//! when its name matches `*<pattern>*`, or `*<pattern>*<tag>*` when a grid
//! or stream tag is given.

use crate::errors::{MonitorError, Result};
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;

fn fragment_glob(dir: &Path, pattern: &str, tag: Option<&str>) -> String {
    let dir = Pattern::escape(&dir.to_string_lossy());
    match tag {
        Some(tag) => format!("{dir}/*{pattern}*{tag}*"),
        None => format!("{dir}/*{pattern}*"),
    }
}

/// Files in `dir` matching any of the comma-separated `patterns`
///
/// Results are sorted and de-duplicated. A missing directory yields no
/// files rather than an error; absence is for the caller to judge.
///
/// # Errors
///
/// Returns an error if a pattern is not a valid glob or a matching entry
/// cannot be read.
pub fn find_fragments(dir: &Path, patterns: &str, tag: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        debug!("Input directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let patterns: Vec<&str> = patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut files = Vec::new();
    for pattern in &patterns {
        for entry in glob(&fragment_glob(dir, pattern, tag))? {
            let path = entry.map_err(|e| MonitorError::Io(e.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    files.dedup();
    debug!(
        "{} files match {:?} (tag {:?}) in {}",
        files.len(),
        patterns,
        tag,
        dir.display()
    );
    Ok(files)
}

/// Atmosphere files of a UM output stream (`*a_<stream>_1*`)
///
/// # Errors
///
/// Returns an error if the directory cannot be searched.
pub fn find_stream_fragments(dir: &Path, stream: &str) -> Result<Vec<PathBuf>> {
    find_fragments(dir, &format!("a_{stream}_1"), None)
}
