use crate::error::Error;
use crate::summary::table::{header_row, write_table};
use crate::summary::{SummaryField, SummaryRecord};
use crossbeam_channel::Receiver;
use std::path::Path;
use tracing::info;

/// Collects one record per series in arrival order and writes the table
/// once the queue closes.
pub struct SummaryAggregator<'a> {
    pub output: &'a Path,
    pub fields: &'a [SummaryField],
}

impl SummaryAggregator<'_> {
    pub fn run(self, records: Receiver<SummaryRecord>) -> Result<usize, Error> {
        let collected: Vec<SummaryRecord> = records.iter().collect();
        let written = write_table(
            self.output,
            &header_row(self.fields),
            collected.iter().map(SummaryRecord::to_row),
        )?;
        info!("Summarized {} series into {}", written, self.output.display());
        Ok(written)
    }
}
