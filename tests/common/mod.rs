#![allow(dead_code)]

use dicom_sorter::decoder::{DecodeError, MetadataDecoder, MetadataRecord};
use std::fs;
use std::path::{Path, PathBuf};

const FIXTURE_MAGIC: &str = "FIXTURE";

/// Decodes plain-text fixtures: a `FIXTURE` line followed by `Name=Value`
/// lines. Anything else is rejected like a non-imaging file.
pub struct FixtureDecoder;

impl MetadataDecoder for FixtureDecoder {
    fn decode(&self, path: &Path) -> Result<MetadataRecord, DecodeError> {
        let text = fs::read_to_string(path).map_err(|e| DecodeError::new(e.to_string()))?;
        let mut lines = text.lines();
        if lines.next() != Some(FIXTURE_MAGIC) {
            return Err(DecodeError::new("missing fixture header"));
        }
        Ok(lines
            .filter_map(|line| line.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

pub fn write_fixture(path: &Path, attributes: &[(&str, &str)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = String::from(FIXTURE_MAGIC);
    for (name, value) in attributes {
        text.push('\n');
        text.push_str(name);
        text.push('=');
        text.push_str(value);
    }
    fs::write(path, text).unwrap();
}

/// A fixture carrying the default template attributes.
pub fn write_instance(path: &Path, patient: &str, study: &str, series: &str, instance: &str) {
    write_fixture(
        path,
        &[
            ("PatientID", patient),
            ("StudyInstanceUID", study),
            ("SeriesInstanceUID", series),
            ("SOPInstanceUID", instance),
            ("Modality", "CT"),
            ("Rows", "512"),
        ],
    );
}

pub fn write_junk(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "just some notes").unwrap();
}

pub fn files_recursive(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(files_recursive(&path));
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

pub fn log_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}
