use super::fields::SummaryField;
use std::path::Path;
use tracing::debug;

pub fn header_row(fields: &[SummaryField]) -> Vec<String> {
    fields.iter().map(|field| field.name.clone()).collect()
}

/// Writes the header followed by every row, replacing any existing file.
/// Returns the number of data rows written.
pub fn write_table<I>(path: &Path, headers: &[String], rows: I) -> Result<usize, csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(headers)?;

    let mut written = 0usize;
    for row in rows {
        wtr.write_record(&row)?;
        written += 1;
    }

    wtr.flush()?;
    debug!("Wrote {} rows to {}", written, path.display());
    Ok(written)
}
