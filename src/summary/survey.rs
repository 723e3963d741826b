//! Read-only metadata survey of a tree: one summary row per directory
//! (or per file with `full`), nothing is moved.

use super::fields::{SummaryField, SummaryRecord};
use super::table::{header_row, write_table};
use crate::decoder::MetadataDecoder;
use crate::error::Error;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const LOCATION_COLUMN: &str = "Location";

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub source_dir: PathBuf,
    /// Summarize every decodable file instead of the first per directory.
    pub full: bool,
    pub fields: Vec<SummaryField>,
    pub summary_output: PathBuf,
    pub error_log: PathBuf,
}

#[derive(Debug)]
pub struct SurveyResult {
    pub directories: usize,
    pub files_summarized: usize,
    pub rows_written: usize,
    pub invalid_files: usize,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct DirectorySurvey {
    rows: Vec<Vec<String>>,
    errors: Vec<String>,
}

/// Surveys `config.source_dir`, writes the deduplicated table and replaces
/// the error log with one line per undecodable file.
pub fn run_survey(
    config: &SurveyConfig,
    decoder: &dyn MetadataDecoder,
) -> Result<SurveyResult, Error> {
    let start = Instant::now();
    if !config.source_dir.is_dir() {
        return Err(Error::InvalidConfig(format!(
            "source directory {} does not exist",
            config.source_dir.display()
        )));
    }

    let groups = files_by_directory(&config.source_dir);
    info!("Surveying {} directories", groups.len());

    let surveys: Vec<DirectorySurvey> = groups
        .par_iter()
        .map(|(dir, files)| survey_directory(dir, files, config, decoder))
        .collect();

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut files_summarized = 0usize;
    for survey in surveys {
        files_summarized += survey.rows.len();
        for row in survey.rows {
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
        errors.extend(survey.errors);
    }

    let mut headers = header_row(&config.fields);
    headers.push(LOCATION_COLUMN.to_string());
    let rows_written = write_table(&config.summary_output, &headers, rows)?;
    fs::write(&config.error_log, errors.join("\n"))?;

    let duration = start.elapsed();
    debug!(
        "Survey of {} files took {:.2}s",
        files_summarized,
        duration.as_secs_f64()
    );

    Ok(SurveyResult {
        directories: groups.len(),
        files_summarized,
        rows_written,
        invalid_files: errors.len(),
        duration,
    })
}

/// Directories in walk order, each with its files sorted by name.
fn files_by_directory(root: &Path) -> Vec<(PathBuf, Vec<PathBuf>)> {
    let mut groups: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            index.insert(entry.path().to_path_buf(), groups.len());
            groups.push((entry.path().to_path_buf(), Vec::new()));
        } else if entry.file_type().is_file() {
            let slot = entry.path().parent().and_then(|parent| index.get(parent));
            if let Some(&slot) = slot {
                groups[slot].1.push(entry.into_path());
            }
        }
    }

    groups
}

fn survey_directory(
    dir: &Path,
    files: &[PathBuf],
    config: &SurveyConfig,
    decoder: &dyn MetadataDecoder,
) -> DirectorySurvey {
    let mut survey = DirectorySurvey::default();
    let location = dir.display().to_string();

    for file in files {
        match decoder.decode(file) {
            Ok(record) => {
                let mut row = SummaryRecord::extract(&record, &config.fields).to_row();
                row.push(location.clone());
                survey.rows.push(row);
                if !config.full {
                    break;
                }
            }
            Err(_) => survey.errors.push(format!("Invalid dicom {}", file.display())),
        }
    }

    survey
}
