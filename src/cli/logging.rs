use std::env;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "dicom_sorter=info,warn";
const DEFAULT_LOG_FILE: &str = "./logs/dicom-sorter.log";

/// Stdout gets short lines; the file also records which worker thread
/// logged each event.
pub fn init_logger() -> WorkerGuard {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let (log_dir, log_name) = split_log_path(Path::new(&log_file_path));

    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_thread_names(true)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    info!("Logging to stdout and {}", log_file_path);

    guard
}

/// Directory and file name for the appender; a bare name logs to `./`.
fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dicom-sorter.log"));
    (dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new(DEFAULT_LOG_FILE)),
            (PathBuf::from("./logs"), PathBuf::from("dicom-sorter.log"))
        );
        assert_eq!(
            split_log_path(Path::new("run.log")),
            (PathBuf::from("."), PathBuf::from("run.log"))
        );
    }
}
