use crate::config::PipelineConfig;
use crate::decoder::{DicomDecoder, MetadataDecoder};
use crate::error::Error;
use crate::pipeline::aggregator::SummaryAggregator;
use crate::pipeline::analyzer::{Analyzer, SummaryOutput};
use crate::pipeline::error_sink::ErrorSink;
use crate::pipeline::monitor::run_monitor;
use crate::pipeline::mover::Mover;
use crate::pipeline::{Issue, MoveRequest, PipelineState};
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::summary::SummaryRecord;
use crossbeam_channel::{bounded, unbounded};
use std::path::PathBuf;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub struct OrganizeEngine {
    config: PipelineConfig,
    decoder: Box<dyn MetadataDecoder>,
}

#[derive(Debug)]
pub struct OrganizeResult {
    pub scan_duration: Duration,
    pub total_duration: Duration,
    pub files_enumerated: usize,
    pub files_processed: usize,
    pub files_moved: usize,
    pub errors_logged: usize,
    pub series_summarized: usize,
}

impl OrganizeEngine {
    /// Uses a DICOM decoder reading exactly the attributes the run needs.
    pub fn new(config: PipelineConfig) -> Self {
        let decoder = DicomDecoder::new(config.required_attributes());
        Self {
            config,
            decoder: Box::new(decoder),
        }
    }

    pub fn with_decoder(mut self, decoder: impl MetadataDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full organize pipeline:
    /// 1. Snapshot the source tree
    /// 2. Analyzers classify and deduplicate, movers relocate and prune
    /// 3. Drain analyzers before movers, movers before the sinks
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<OrganizeResult, Error> {
        let config = &self.config;
        let run_start = Instant::now();
        info!(
            "Organizing {} into {} as {}",
            config.source_dir.display(),
            config.output_dir.display(),
            config.template
        );

        // Phase 1: Scan
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let files = scanner::collect_files(&config.source_dir, &config.ignore_patterns)?;
        let scan_duration = scan_start.elapsed();
        let files_enumerated = files.len();
        reporter.on_scan_complete(files_enumerated, scan_duration.as_secs_f64());
        debug!(
            "Scan completed in {:.2}s, {} files",
            scan_duration.as_secs_f64(),
            files_enumerated
        );

        // Phase 2: Shared state and queues, all before any worker starts
        let state = PipelineState::default();
        let (work_tx, work_rx) = unbounded::<PathBuf>();
        let (move_tx, move_rx) = unbounded::<MoveRequest>();
        let (issue_tx, issue_rx) = unbounded::<Issue>();
        let (summary_tx, summary_rx) = unbounded::<SummaryRecord>();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let sink = ErrorSink::open(&config.error_log)?;

        let outcome = thread::scope(|s| -> Result<(usize, usize), Error> {
            let sink_handle = thread::Builder::new()
                .name("error-sink".to_string())
                .spawn_scoped(s, move || sink.run(issue_rx))?;

            let aggregator_handle = if config.summarize {
                let aggregator = SummaryAggregator {
                    output: &config.summary_output,
                    fields: &config.summary_fields,
                };
                Some(
                    thread::Builder::new()
                        .name("summary".to_string())
                        .spawn_scoped(s, move || aggregator.run(summary_rx))?,
                )
            } else {
                drop(summary_rx);
                None
            };

            let state_ref = &state;
            let monitor_handle = thread::Builder::new()
                .name("progress".to_string())
                .spawn_scoped(s, move || {
                    run_monitor(state_ref, reporter, config.progress_interval, stop_rx)
                })?;

            let mut analyzers = Vec::with_capacity(config.analyzer_workers);
            for worker_id in 0..config.analyzer_workers {
                let analyzer = Analyzer {
                    decoder: self.decoder.as_ref(),
                    template: &config.template,
                    output_root: &config.output_dir,
                    state: &state,
                    moves: move_tx.clone(),
                    issues: issue_tx.clone(),
                    summary: config.summarize.then(|| SummaryOutput {
                        fields: &config.summary_fields,
                        records: summary_tx.clone(),
                    }),
                };
                let work = work_rx.clone();
                analyzers.push(
                    thread::Builder::new()
                        .name(format!("analyzer-{}", worker_id))
                        .spawn_scoped(s, move || analyzer.run(worker_id, work))?,
                );
            }

            let mut movers = Vec::with_capacity(config.mover_workers);
            for worker_id in 0..config.mover_workers {
                let mover = Mover {
                    source_root: &config.source_dir,
                    state: &state,
                    issues: issue_tx.clone(),
                };
                let requests = move_rx.clone();
                movers.push(
                    thread::Builder::new()
                        .name(format!("mover-{}", worker_id))
                        .spawn_scoped(s, move || mover.run(worker_id, requests))?,
                );
            }

            // Analyzers now own the only senders of the mover and summary
            // queues, so those close exactly when the last analyzer exits.
            drop(move_tx);
            drop(summary_tx);
            drop(work_rx);
            drop(move_rx);
            info!(
                "Started {} analyzers and {} movers",
                config.analyzer_workers, config.mover_workers
            );

            for path in files {
                if let Err(e) = work_tx.send(path) {
                    error!("Analyzer queue closed, {} not queued", e.into_inner().display());
                    break;
                }
            }
            drop(work_tx);

            join_all(analyzers, "analyzer")?;
            state.mark_analysis_complete();
            reporter.on_analysis_complete(state.counters.processed());
            debug!("All analyzers stopped");

            join_all(movers, "mover")?;
            state.mark_move_complete();
            debug!("All movers stopped");

            drop(stop_tx);
            drop(issue_tx);
            let errors_logged = sink_handle
                .join()
                .map_err(|_| Error::WorkerPanicked("error sink".to_string()))??;
            let series_summarized = match aggregator_handle {
                Some(handle) => handle
                    .join()
                    .map_err(|_| Error::WorkerPanicked("summary".to_string()))??,
                None => 0,
            };
            monitor_handle
                .join()
                .map_err(|_| Error::WorkerPanicked("progress".to_string()))?;

            Ok((errors_logged, series_summarized))
        })?;
        let (errors_logged, series_summarized) = outcome;

        let total_duration = run_start.elapsed();
        reporter.on_move_complete(state.counters.moved(), total_duration.as_secs_f64());

        Ok(OrganizeResult {
            scan_duration,
            total_duration,
            files_enumerated,
            files_processed: state.counters.processed(),
            files_moved: state.counters.moved(),
            errors_logged,
            series_summarized,
        })
    }
}

fn join_all(handles: Vec<ScopedJoinHandle<'_, ()>>, role: &str) -> Result<(), Error> {
    let mut panicked = false;
    for (i, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            error!("{} {} panicked", role, i);
            panicked = true;
        }
    }
    if panicked {
        return Err(Error::WorkerPanicked(role.to_string()));
    }
    Ok(())
}
