use crate::decoder::MetadataRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a raw attribute value is converted before it lands in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    Text,
    Float,
    Integer,
    FloatList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryValue {
    Text(String),
    Float(f64),
    Integer(i64),
    FloatList(Vec<f64>),
    Missing,
}

impl Coercion {
    /// Returns `None` when the raw value does not convert.
    pub fn apply(self, raw: &str) -> Option<SummaryValue> {
        match self {
            Coercion::Text => Some(SummaryValue::Text(raw.to_string())),
            Coercion::Float => raw.trim().parse().ok().map(SummaryValue::Float),
            Coercion::Integer => raw.trim().parse().ok().map(SummaryValue::Integer),
            Coercion::FloatList => {
                if raw.trim().is_empty() {
                    return None;
                }
                raw.split('\\')
                    .map(|part| part.trim().parse::<f64>().ok())
                    .collect::<Option<Vec<_>>>()
                    .map(SummaryValue::FloatList)
            }
        }
    }
}

impl SummaryValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, SummaryValue::Missing)
    }
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryValue::Text(text) => f.write_str(text),
            SummaryValue::Float(value) => write!(f, "{:?}", value),
            SummaryValue::Integer(value) => write!(f, "{}", value),
            SummaryValue::FloatList(values) => {
                let parts: Vec<String> = values.iter().map(|v| format!("{:?}", v)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            SummaryValue::Missing => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryField {
    pub name: String,
    pub coercion: Coercion,
}

impl SummaryField {
    pub fn new(name: impl Into<String>, coercion: Coercion) -> Self {
        Self {
            name: name.into(),
            coercion,
        }
    }
}

const STANDARD_FIELDS: &[(&str, Coercion)] = &[
    ("SeriesInstanceUID", Coercion::Text),
    ("StudyInstanceUID", Coercion::Text),
    ("PatientName", Coercion::Text),
    ("PatientID", Coercion::Text),
    ("Modality", Coercion::Text),
    ("PatientSex", Coercion::Text),
    ("SliceThickness", Coercion::Float),
    ("PixelSpacing", Coercion::FloatList),
    ("ConvolutionKernel", Coercion::Text),
    ("Rows", Coercion::Integer),
    ("Columns", Coercion::Integer),
    ("Manufacturer", Coercion::Text),
    ("InstitutionName", Coercion::Text),
    ("StudyDescription", Coercion::Text),
    ("SeriesDescription", Coercion::Text),
    ("KVP", Coercion::Float),
    ("Exposure", Coercion::Integer),
    ("AccessionNumber", Coercion::Text),
    ("ImageType", Coercion::Text),
    ("MagneticFieldStrength", Coercion::Float),
    ("EchoTime", Coercion::Float),
    ("InversionTime", Coercion::Float),
    ("ImagedNucleus", Coercion::Text),
    ("ImagingFrequency", Coercion::Float),
    ("NumberOfAverages", Coercion::Integer),
    ("SpacingBetweenSlices", Coercion::Float),
    ("EchoTrainLength", Coercion::Integer),
    ("PercentPhaseFieldOfView", Coercion::Float),
    ("PixelBandwidth", Coercion::Float),
    ("ContrastBolusAgent", Coercion::Text),
    ("ReconstructionDiameter", Coercion::Float),
];

/// The per-series attributes summarized when no list is configured.
pub fn standard_fields() -> Vec<SummaryField> {
    STANDARD_FIELDS
        .iter()
        .map(|(name, coercion)| SummaryField::new(*name, *coercion))
        .collect()
}

/// One row of the summary table, with values in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    values: Vec<(String, SummaryValue)>,
}

impl SummaryRecord {
    /// Absent attributes and failed conversions become [`SummaryValue::Missing`].
    pub fn extract(record: &MetadataRecord, fields: &[SummaryField]) -> Self {
        let values = fields
            .iter()
            .map(|field| {
                let value = record
                    .get(&field.name)
                    .ok()
                    .and_then(|raw| field.coercion.apply(raw))
                    .unwrap_or(SummaryValue::Missing);
                (field.name.clone(), value)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&SummaryValue> {
        self.values
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn to_row(&self) -> Vec<String> {
        self.values.iter().map(|(_, value)| value.to_string()).collect()
    }
}
