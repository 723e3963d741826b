use super::PipelineState;
use crate::progress::ProgressReporter;
use crossbeam_channel::{select, tick, Receiver};
use std::time::Duration;

/// Reports the processed and moved counters every `interval` until the run
/// is finished or `stop` is closed.
pub fn run_monitor(
    state: &PipelineState,
    reporter: &dyn ProgressReporter,
    interval: Duration,
    stop: Receiver<()>,
) {
    let ticker = tick(interval);
    loop {
        reporter.on_progress(state.counters.processed(), state.counters.moved());
        if state.is_finished() {
            break;
        }
        let stopped = select! {
            recv(ticker) -> _ => false,
            recv(stop) -> _ => true,
        };
        if stopped {
            reporter.on_progress(state.counters.processed(), state.counters.moved());
            break;
        }
    }
}
