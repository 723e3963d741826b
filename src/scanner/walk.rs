use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::error;

/// Parallel directory traversal. Returns every regular file beneath `root`,
/// skipping symlinks and anything matching an ignore glob. No ordering is
/// guaranteed.
pub fn collect_files(root: &Path, ignore_globs: &[String]) -> io::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Source directory {} does not exist", root.display()),
        ));
    }

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let files = Mutex::new(Vec::new());
    visit_dirs(root, &files, &ignore_patterns)?;

    files
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

fn visit_dirs(dir: &Path, files: &Mutex<Vec<PathBuf>>, ignore_patterns: &[Pattern]) -> io::Result<()> {
    if ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(dir))
    {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!("Access denied reading directory {}: {}", dir.display(), err);
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error reading entry in directory {}: {}", dir.display(), err);
                return Ok(());
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                error!("Error getting file type for {}: {}", path.display(), err);
                return Ok(());
            }
        };

        if file_type.is_dir() {
            visit_dirs(&path, files, ignore_patterns)?;
        } else if file_type.is_file()
            && !ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(&path))
        {
            files
                .lock()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?
                .push(path);
        }
        Ok(())
    })
}
