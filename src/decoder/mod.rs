mod dicom;

pub use dicom::DicomDecoder;

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Attribute carrying the per-file instance identifier.
pub const SOP_INSTANCE_UID: &str = "SOPInstanceUID";
/// Attribute grouping files of one acquisition.
pub const SERIES_INSTANCE_UID: &str = "SeriesInstanceUID";

/// The file could not be parsed as an imaging file.
#[derive(Error, Debug, Clone)]
#[error("{reason}")]
pub struct DecodeError {
    reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("attribute {0} is missing")]
pub struct AttributeMissing(pub String);

/// Named attributes extracted from one decoded file, rendered as text.
///
/// Multi-valued attributes are stored with their values joined by `\`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    attributes: HashMap<String, String>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Result<&str, AttributeMissing> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AttributeMissing(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MetadataRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = MetadataRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

/// Turns a file into a [`MetadataRecord`] or reports why it is not one.
///
/// Implementations are shared by every analyzer thread.
pub trait MetadataDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<MetadataRecord, DecodeError>;
}
