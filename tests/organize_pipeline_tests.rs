mod common;

use common::{files_recursive, log_lines, write_fixture, write_instance, write_junk, FixtureDecoder};
use dicom_sorter::summary::{Coercion, SummaryField};
use dicom_sorter::{OrganizeEngine, PipelineConfig, SilentReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

struct Workspace {
    _tmp: TempDir,
    source: PathBuf,
    output: PathBuf,
    artifacts: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("incoming");
        let output = tmp.path().join("sorted");
        let artifacts = tmp.path().join("artifacts");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&artifacts).unwrap();
        Self {
            _tmp: tmp,
            source,
            output,
            artifacts,
        }
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.source).with_jobs(4);
        config.output_dir = self.output.clone();
        config.error_log = self.error_log();
        config.summary_output = self.summary();
        config.summary_fields = vec![
            SummaryField::new("SeriesInstanceUID", Coercion::Text),
            SummaryField::new("Modality", Coercion::Text),
            SummaryField::new("Rows", Coercion::Integer),
        ];
        config
    }

    fn error_log(&self) -> PathBuf {
        self.artifacts.join("errors.log")
    }

    fn summary(&self) -> PathBuf {
        self.artifacts.join("summary.csv")
    }
}

fn run(config: PipelineConfig) -> dicom_sorter::OrganizeResult {
    OrganizeEngine::new(config)
        .with_decoder(FixtureDecoder)
        .run(&SilentReporter)
        .unwrap()
}

fn series_dir(root: &Path) -> PathBuf {
    root.join("P1").join("1.2.3").join("1.2.3.4")
}

#[test]
fn test_same_series_moves_all_and_summarizes_once() {
    let ws = Workspace::new();
    for (i, dir) in ["a", "b/c", "b/d"].iter().enumerate() {
        let name = format!("img{}.dcm", i);
        write_instance(
            &ws.source.join(dir).join(&name),
            "P1",
            "1.2.3",
            "1.2.3.4",
            &format!("1.2.3.4.{}", i),
        );
    }

    let result = run(ws.config());

    assert_eq!(result.files_enumerated, 3);
    assert_eq!(result.files_processed, 3);
    assert_eq!(result.files_moved, 3);
    assert_eq!(result.series_summarized, 1);
    assert_eq!(result.errors_logged, 0);

    let moved = files_recursive(&ws.output);
    assert_eq!(moved.len(), 3);
    for file in &moved {
        assert_eq!(file.parent().unwrap(), series_dir(&ws.output));
    }

    let summary = fs::read_to_string(ws.summary()).unwrap();
    assert_eq!(summary, "SeriesInstanceUID,Modality,Rows\n1.2.3.4,CT,512\n");
    assert!(log_lines(&ws.error_log()).is_empty());
}

#[test]
fn test_duplicate_instance_moves_only_first() {
    let ws = Workspace::new();
    write_instance(&ws.source.join("x/first.dcm"), "P1", "1.2.3", "1.2.3.4", "9.9");
    write_instance(&ws.source.join("y/second.dcm"), "P1", "1.2.3", "1.2.3.4", "9.9");

    let result = run(ws.config());

    assert_eq!(result.files_processed, 1);
    assert_eq!(result.files_moved, 1);
    assert_eq!(files_recursive(&ws.output).len(), 1);
    assert_eq!(files_recursive(&ws.source).len(), 1);

    let lines = log_lines(&ws.error_log());
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Duplicate detected...Skipping "));
    let skipped = PathBuf::from(lines[0].trim_start_matches("Duplicate detected...Skipping "));
    assert!(skipped.exists(), "duplicate should stay where it was");
}

#[test]
fn test_undecodable_file_goes_to_non_dicoms() {
    let ws = Workspace::new();
    let junk = ws.source.join("misc/readme.txt");
    write_junk(&junk);

    let result = run(ws.config());

    assert_eq!(result.files_moved, 1);
    assert!(ws.output.join("non-dicoms/readme.txt").is_file());
    assert_eq!(
        log_lines(&ws.error_log()),
        vec![format!("Invalid dicom: {}", junk.display())]
    );
    assert_eq!(result.series_summarized, 0);
}

#[test]
fn test_missing_template_attribute_goes_to_uncategorized() {
    let ws = Workspace::new();
    let file = ws.source.join("scan.dcm");
    write_fixture(
        &file,
        &[
            ("PatientID", "P1"),
            ("SeriesInstanceUID", "1.2.3.4"),
            ("SOPInstanceUID", "1.2.3.4.1"),
        ],
    );

    let result = run(ws.config());

    assert_eq!(result.files_moved, 1);
    assert!(ws.output.join("uncategorized_dicoms/scan.dcm").is_file());
    assert_eq!(
        log_lines(&ws.error_log()),
        vec![format!("Did not find all required tags in {}", file.display())]
    );
}

#[test]
fn test_missing_series_is_dropped() {
    let ws = Workspace::new();
    let file = ws.source.join("d/orphan.dcm");
    write_fixture(&file, &[("PatientID", "P1"), ("SOPInstanceUID", "7.7")]);

    let mut config = ws.config();
    config.template = "PatientID".parse().unwrap();
    let result = run(config);

    assert_eq!(result.files_processed, 0);
    assert_eq!(result.files_moved, 0);
    assert!(file.exists());
    assert_eq!(
        log_lines(&ws.error_log()),
        vec![format!("No series information...Skipping {}", file.display())]
    );
}

#[test]
fn test_dot_metadata_values_stay_inside_output() {
    let ws = Workspace::new();
    write_instance(&ws.source.join("a.dcm"), "..", "..", "1.2", "1.2.1");
    write_instance(&ws.source.join("b.dcm"), ".", "1.2.3", "1.2.3.4", "1.2.3.4.1");

    let result = run(ws.config());

    assert_eq!(result.files_moved, 2);
    assert_eq!(
        files_recursive(&ws.output),
        vec![
            ws.output.join("_").join("1.2.3").join("1.2.3.4").join("b.dcm"),
            ws.output.join("__").join("__").join("1.2").join("a.dcm"),
        ]
    );
}

#[test]
fn test_same_named_files_never_replace_each_other() {
    let ws = Workspace::new();
    for i in 0..8 {
        write_fixture(
            &ws.source.join(format!("disc{}/DICOMDIR", i)),
            &[("PatientID", "P1"), ("SOPInstanceUID", &format!("9.{}", i))],
        );
    }

    let result = run(ws.config().with_jobs(16));

    let landed = ws.output.join("uncategorized_dicoms/DICOMDIR");
    assert_eq!(result.files_moved, 1);
    assert!(landed.is_file());
    assert_eq!(files_recursive(&ws.source).len(), 7);
    let lines = log_lines(&ws.error_log());
    assert_eq!(
        lines.iter().filter(|line| line.contains("already exists")).count(),
        7
    );
}

#[test]
fn test_emptied_directories_pruned_but_root_survives() {
    let ws = Workspace::new();
    write_instance(&ws.source.join("deep/er/still/a.dcm"), "P1", "1.2.3", "1.2.3.4", "1");
    write_instance(&ws.source.join("keep/b.dcm"), "P1", "1.2.3", "1.2.3.4", "2");
    write_instance(&ws.source.join("keep/b_dup.dcm"), "P1", "1.2.3", "1.2.3.4", "2");

    run(ws.config());

    assert!(!ws.source.join("deep").exists());
    assert!(ws.source.join("keep").exists(), "duplicate left behind keeps its directory");
    assert!(ws.source.exists());

    let ws = Workspace::new();
    write_instance(&ws.source.join("only/a.dcm"), "P1", "1.2.3", "1.2.3.4", "1");
    run(ws.config());
    assert!(ws.source.exists());
    assert_eq!(fs::read_dir(&ws.source).unwrap().count(), 0);
}

#[test]
fn test_one_summary_per_series_with_many_workers() {
    let ws = Workspace::new();
    for i in 0..60 {
        let series = format!("1.2.3.{}", i % 3);
        write_instance(
            &ws.source.join(format!("batch{}/f{}.dcm", i % 7, i)),
            &format!("P{}", i % 2),
            "1.2.3",
            &series,
            &format!("inst.{}", i),
        );
    }

    let result = run(ws.config().with_jobs(16));

    assert_eq!(result.files_moved, 60);
    assert_eq!(result.series_summarized, 3);
    let summary = fs::read_to_string(ws.summary()).unwrap();
    assert_eq!(summary.lines().count(), 4);
}

#[test]
fn test_rerun_on_organized_output_is_stable() {
    let ws = Workspace::new();
    write_instance(&ws.source.join("raw/a.dcm"), "P1", "1.2.3", "1.2.3.4", "1");
    write_instance(&ws.source.join("raw/b.dcm"), "P1", "1.2.3", "1.2.3.4", "2");
    write_junk(&ws.source.join("raw/notes.txt"));

    let mut config = ws.config();
    config.output_dir = ws.source.clone();
    run(config.clone());
    let first = files_recursive(&ws.source);
    assert!(!ws.source.join("raw").exists());
    assert!(first.contains(&series_dir(&ws.source).join("a.dcm")));
    assert!(first.contains(&ws.source.join("non-dicoms/notes.txt")));

    let second_result = run(config);
    assert_eq!(files_recursive(&ws.source), first);
    assert_eq!(second_result.files_moved, 3);
}

#[test]
fn test_summarize_disabled_writes_no_table() {
    let ws = Workspace::new();
    write_instance(&ws.source.join("a.dcm"), "P1", "1.2.3", "1.2.3.4", "1");

    let mut config = ws.config();
    config.summarize = false;
    let result = run(config);

    assert_eq!(result.files_moved, 1);
    assert_eq!(result.series_summarized, 0);
    assert!(!ws.summary().exists());
}

#[test]
fn test_missing_source_is_fatal() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.source_dir = ws.source.join("does-not-exist");

    let result = OrganizeEngine::new(config)
        .with_decoder(FixtureDecoder)
        .run(&SilentReporter);
    assert!(result.is_err());
}
