use super::Issue;
use crossbeam_channel::Receiver;
use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// The single writer of the error log. Every worker sends [`Issue`]s here,
/// so lines are never interleaved.
pub struct ErrorSink {
    writer: LineWriter<File>,
}

impl ErrorSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        Ok(Self {
            writer: LineWriter::new(file),
        })
    }

    /// Drains `issues` until every sender is gone. Returns the number of
    /// lines written.
    pub fn run(mut self, issues: Receiver<Issue>) -> io::Result<usize> {
        let mut written = 0usize;
        for issue in issues {
            debug!("{}", issue);
            if let Err(e) = writeln!(self.writer, "{}", issue) {
                warn!("Could not append to error log: {}", e);
                continue;
            }
            written += 1;
        }
        self.writer.flush()?;
        Ok(written)
    }
}
