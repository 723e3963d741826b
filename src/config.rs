use crate::decoder::{SERIES_INSTANCE_UID, SOP_INSTANCE_UID};
use crate::error::Error;
use crate::pipeline::template::{PathTemplate, DEFAULT_PATH_FORMAT};
use crate::summary::{standard_fields, SummaryField};
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// File- and environment-level settings. Command line arguments are applied
/// on top before the run is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub path_format: String,
    pub n_jobs: usize,
    pub summarize: bool,
    pub summary_output: PathBuf,
    pub error_log: PathBuf,
    pub ignore_patterns: Vec<String>,
    pub progress_interval_ms: u64,
    pub summary_fields: Option<Vec<SummaryField>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            output_dir: None,
            path_format: DEFAULT_PATH_FORMAT.to_string(),
            n_jobs: 10,
            summarize: true,
            summary_output: PathBuf::from("summary.csv"),
            error_log: PathBuf::from("errors.log"),
            ignore_patterns: Vec::new(),
            progress_interval_ms: 1000,
            summary_fields: None,
        }
    }
}

/// Reads the optional `Config` file, then `DICOM_SORTER_*` variables.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("DICOM_SORTER"))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

/// Everything one organize run needs, validated.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template: PathTemplate,
    pub analyzer_workers: usize,
    pub mover_workers: usize,
    pub summarize: bool,
    pub summary_fields: Vec<SummaryField>,
    pub summary_output: PathBuf,
    pub error_log: PathBuf,
    pub ignore_patterns: Vec<String>,
    pub progress_interval: Duration,
}

impl PipelineConfig {
    /// Defaults for everything but the source directory.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        let defaults = AppConfig::default();
        let (analyzer_workers, mover_workers) = split_workers(defaults.n_jobs);
        Self {
            output_dir: source_dir.clone(),
            source_dir,
            template: PathTemplate::default(),
            analyzer_workers,
            mover_workers,
            summarize: defaults.summarize,
            summary_fields: standard_fields(),
            summary_output: defaults.summary_output,
            error_log: defaults.error_log,
            ignore_patterns: defaults.ignore_patterns,
            progress_interval: Duration::from_millis(defaults.progress_interval_ms),
        }
    }

    pub fn from_app_config(app: &AppConfig) -> Result<Self, Error> {
        let source_dir = app
            .source_dir
            .clone()
            .ok_or_else(|| Error::InvalidConfig("no source directory given".to_string()))?;
        if app.n_jobs == 0 {
            return Err(Error::InvalidConfig("n_jobs must be at least 1".to_string()));
        }
        if app.progress_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "progress_interval_ms must be at least 1".to_string(),
            ));
        }
        let (analyzer_workers, mover_workers) = split_workers(app.n_jobs);

        Ok(Self {
            output_dir: app.output_dir.clone().unwrap_or_else(|| source_dir.clone()),
            source_dir,
            template: app.path_format.parse()?,
            analyzer_workers,
            mover_workers,
            summarize: app.summarize,
            summary_fields: app.summary_fields.clone().unwrap_or_else(standard_fields),
            summary_output: app.summary_output.clone(),
            error_log: app.error_log.clone(),
            ignore_patterns: app.ignore_patterns.clone(),
            progress_interval: Duration::from_millis(app.progress_interval_ms),
        })
    }

    pub fn with_jobs(mut self, n_jobs: usize) -> Self {
        let (analyzer_workers, mover_workers) = split_workers(n_jobs);
        self.analyzer_workers = analyzer_workers;
        self.mover_workers = mover_workers;
        self
    }

    /// Every attribute an analyzer may read from a decoded file.
    pub fn required_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.template.keys().to_vec();
        names.push(SOP_INSTANCE_UID.to_string());
        names.push(SERIES_INSTANCE_UID.to_string());
        names.extend(self.summary_fields.iter().map(|field| field.name.clone()));
        names.sort();
        names.dedup();
        names
    }
}

/// Splits the job count between analyzers and movers, at least one each.
pub fn split_workers(n_jobs: usize) -> (usize, usize) {
    let movers = n_jobs / 2;
    let analyzers = n_jobs - movers;
    (analyzers.max(1), movers.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_config_value_is_a_config_error() {
        let err = Config::builder()
            .set_override("n_jobs", "many")
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize::<AppConfig>())
            .map_err(Error::from)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_split_workers() {
        assert_eq!(split_workers(10), (5, 5));
        assert_eq!(split_workers(7), (4, 3));
        assert_eq!(split_workers(1), (1, 1));
    }

    #[test]
    fn test_output_defaults_to_source() {
        let app = AppConfig {
            source_dir: Some(PathBuf::from("/data/in")),
            ..AppConfig::default()
        };
        let config = PipelineConfig::from_app_config(&app).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/data/in"));
        assert_eq!(config.template.to_string(), DEFAULT_PATH_FORMAT);
        assert_eq!(config.summary_fields.len(), 31);
    }

    #[test]
    fn test_rejects_missing_source_and_zero_jobs() {
        assert!(PipelineConfig::from_app_config(&AppConfig::default()).is_err());
        let app = AppConfig {
            source_dir: Some(PathBuf::from("/data/in")),
            n_jobs: 0,
            ..AppConfig::default()
        };
        assert!(PipelineConfig::from_app_config(&app).is_err());
    }

    #[test]
    fn test_required_attributes_cover_identifiers() {
        let mut config = PipelineConfig::new("/data/in");
        config.summary_fields.clear();
        assert_eq!(
            config.required_attributes(),
            vec![
                "PatientID",
                "SOPInstanceUID",
                "SeriesInstanceUID",
                "StudyInstanceUID"
            ]
        );
    }
}
