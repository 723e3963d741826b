use crate::decoder::{AttributeMissing, MetadataRecord};
use crate::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_PATH_FORMAT: &str = "PatientID/StudyInstanceUID/SeriesInstanceUID";

/// Ordered attribute names, one directory level each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    keys: Vec<String>,
}

impl PathTemplate {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Builds `root/value1/.../valueN`, one level per value. Blank values
    /// count as missing.
    pub fn destination(
        &self,
        root: &Path,
        record: &MetadataRecord,
    ) -> Result<PathBuf, AttributeMissing> {
        let mut destination = root.to_path_buf();
        for key in &self.keys {
            let value = record.get(key)?;
            if value.trim().is_empty() {
                return Err(AttributeMissing(key.clone()));
            }
            destination.push(path_segment(value));
        }
        Ok(destination)
    }
}

/// Separators and dot-only values (`.`, `..`) would escape or collapse a
/// level, so they become `_`.
fn path_segment(value: &str) -> String {
    if value.chars().all(|c| c == '.') {
        return "_".repeat(value.len());
    }
    value
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        let keys: Vec<String> = format
            .split('/')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from)
            .collect();

        if keys.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "path format '{}' names no attributes",
                format
            )));
        }
        Ok(Self { keys })
    }
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self {
            keys: DEFAULT_PATH_FORMAT.split('/').map(String::from).collect(),
        }
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("/"))
    }
}
