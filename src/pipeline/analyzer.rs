use super::{Issue, MoveRequest, PathTemplate, PipelineState, NON_DICOM_DIR, UNCATEGORIZED_DIR};
use crate::decoder::{MetadataDecoder, SERIES_INSTANCE_UID, SOP_INSTANCE_UID};
use crate::summary::{SummaryField, SummaryRecord};
use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace};

/// Per-series summarization: the attributes to extract and where records go.
pub struct SummaryOutput<'a> {
    pub fields: &'a [SummaryField],
    pub records: Sender<SummaryRecord>,
}

/// One analyzer worker. Classifies files, deduplicates instances and
/// forwards everything that should be moved.
pub struct Analyzer<'a> {
    pub decoder: &'a dyn MetadataDecoder,
    pub template: &'a PathTemplate,
    pub output_root: &'a Path,
    pub state: &'a PipelineState,
    pub moves: Sender<MoveRequest>,
    pub issues: Sender<Issue>,
    pub summary: Option<SummaryOutput<'a>>,
}

impl Analyzer<'_> {
    /// Pulls work until the queue is closed and drained.
    pub fn run(self, worker_id: usize, work: Receiver<PathBuf>) {
        debug!("Analyzer {} started", worker_id);

        for path in work {
            if let Some(request) = self.analyze(&path) {
                self.state.counters.record_processed();
                if let Err(e) = self.moves.send(request) {
                    error!("Analyzer {} could not queue {}: mover queue closed", worker_id, e.into_inner().source.display());
                }
            }
        }

        debug!("Analyzer {} stopped", worker_id);
    }

    /// Returns the move to perform, or `None` when the file is dropped.
    pub fn analyze(&self, path: &Path) -> Option<MoveRequest> {
        let record = match self.decoder.decode(path) {
            Ok(record) => record,
            Err(e) => {
                trace!("Decode failed for {}: {}", path.display(), e);
                self.report(Issue::InvalidFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                return Some(self.request(path, self.output_root.join(NON_DICOM_DIR)));
            }
        };

        let destination = match self.template.destination(self.output_root, &record) {
            Ok(destination) => destination,
            Err(missing) => {
                trace!("{} lacks {}", path.display(), missing.0);
                self.report(Issue::MissingTags {
                    path: path.to_path_buf(),
                    attribute: missing.0,
                });
                return Some(self.request(path, self.output_root.join(UNCATEGORIZED_DIR)));
            }
        };

        if let Ok(instance) = record.get(SOP_INSTANCE_UID) {
            if !self.state.instances.first_sighting(instance) {
                self.report(Issue::Duplicate {
                    path: path.to_path_buf(),
                });
                return None;
            }
        }

        let series = match record.get(SERIES_INSTANCE_UID) {
            Ok(series) => series,
            Err(_) => {
                self.report(Issue::NoSeries {
                    path: path.to_path_buf(),
                });
                return None;
            }
        };

        if let Some(summary) = &self.summary {
            if self.state.series.first_sighting(series) {
                let summary_record = SummaryRecord::extract(&record, summary.fields);
                if summary.records.send(summary_record).is_err() {
                    error!("Summary queue closed, series {} not summarized", series);
                }
            }
        }

        Some(self.request(path, destination))
    }

    fn request(&self, path: &Path, destination: PathBuf) -> MoveRequest {
        MoveRequest {
            source: path.to_path_buf(),
            destination,
        }
    }

    fn report(&self, issue: Issue) {
        if let Err(e) = self.issues.send(issue) {
            error!("Error sink closed, dropping: {}", e.into_inner());
        }
    }
}
