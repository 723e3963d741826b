use console::Term;
use dicom_sorter::ProgressReporter;
use indicatif::{HumanCount, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const STEADY_TICK: Duration = Duration::from_millis(80);

/// CLI progress reporter using indicatif.
///
/// - Scan phase: spinner (file count unknown upfront)
/// - Organize phase: bar over enumerated files, moved count in the message
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    term: Term,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            term: Term::stdout(),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let Ok(mut guard) = self.bar.lock() else {
            return;
        };
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }

    /// Clears any bar and shows the cursor again.
    fn restore(&self) {
        self.finish_bar();
        let _ = self.term.show_cursor();
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

/// Clears the bar and restores the cursor even when a run fails midway.
impl Drop for CliReporter {
    fn drop(&mut self) {
        self.restore();
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        let _ = self.term.hide_cursor();
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message("Scanning files...");
        pb.enable_steady_tick(STEADY_TICK);
        self.set_bar(pb);
    }

    fn on_scan_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files in {:.2}s",
            HumanCount(total_files as u64),
            duration_secs
        );

        let pb = ProgressBar::new(total_files as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Analyzing [{bar:30.cyan/dim}] {pos}/{len} files {msg}",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(STEADY_TICK);
        self.set_bar(pb);
    }

    fn on_progress(&self, processed: usize, moved: usize) {
        self.with_bar(|pb| {
            pb.set_position(processed as u64);
            pb.set_message(format!("(moved: {})", HumanCount(moved as u64)));
        });
    }

    fn on_analysis_complete(&self, processed: usize) {
        self.with_bar(|pb| {
            pb.set_position(processed as u64);
            pb.set_message("(analysis done, moving remaining files)");
        });
    }

    fn on_move_complete(&self, moved: usize, duration_secs: f64) {
        self.restore();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Organize complete: {} files moved in {:.2}s",
            HumanCount(moved as u64),
            duration_secs
        );
    }
}
