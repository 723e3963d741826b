use super::{DecodeError, MetadataDecoder, MetadataRecord};
use dicom_dictionary_std::tags;
use dicom_object::OpenFileOptions;
use std::path::Path;
use tracing::trace;

/// Reads DICOM Part 10 files, extracting only the attributes it was built with.
///
/// Parsing stops at the pixel data so large volumes are never loaded.
#[derive(Debug, Clone)]
pub struct DicomDecoder {
    attributes: Vec<String>,
}

impl DicomDecoder {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        attributes.sort();
        attributes.dedup();
        Self { attributes }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }
}

impl MetadataDecoder for DicomDecoder {
    fn decode(&self, path: &Path) -> Result<MetadataRecord, DecodeError> {
        let object = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| DecodeError::new(e.to_string()))?;

        let mut record = MetadataRecord::new();
        for name in &self.attributes {
            let element = match object.element_by_name(name) {
                Ok(element) => element,
                Err(_) => continue,
            };
            match element.to_str() {
                Ok(value) => {
                    let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
                    record.insert(name.as_str(), value);
                }
                Err(e) => trace!("{} in {} has no text form: {}", name, path.display(), e),
            }
        }

        Ok(record)
    }
}
