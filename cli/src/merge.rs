use std::path::{Path, PathBuf};

use context::junit::{merge_with_policy, MergePolicy, TestSuites};

use crate::post_run::PostRunCommand;
use crate::scanner::scan_reports;

pub const DEFAULT_TESTLOGS_DIR: &str = "bazel-testlogs";
pub const DEFAULT_OUTPUT_FILE: &str = "results.xml";
pub const DEFAULT_REPORT_FILE_NAME: &str = "test.xml";

/// Everything a merge run needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub testlogs_dir: PathBuf,
    pub output_file: PathBuf,
    pub report_file_name: String,
    pub merge_policy: MergePolicy,
    pub post_run: Option<PostRunCommand>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            testlogs_dir: PathBuf::from(DEFAULT_TESTLOGS_DIR),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            report_file_name: String::from(DEFAULT_REPORT_FILE_NAME),
            merge_policy: MergePolicy::default(),
            post_run: None,
        }
    }
}

/// Collects the reports below the testlogs dir, merges them, writes the result and runs the
/// post-run command. Returns the process exit code.
///
/// Reports that cannot be read or parsed are skipped with a warning. A failing post-run command
/// is logged and does not change the exit code.
pub fn run_merge(config: &MergeConfig) -> anyhow::Result<i32> {
    let report_files = match scan_reports(&config.testlogs_dir, &config.report_file_name) {
        Ok(report_files) => report_files,
        Err(e) => {
            log::error!("{:?}", e);
            return Ok(exitcode::NOINPUT);
        }
    };

    if report_files.is_empty() {
        log::info!("No {} files found.", config.report_file_name);
        return Ok(exitcode::OK);
    }
    log::info!(
        "Found {} {} files.",
        report_files.len(),
        config.report_file_name
    );

    let runs = read_reports(&report_files);
    let merged = merge_with_policy(config.merge_policy, &runs);
    let serialized = merged.to_string()?;

    if let Err(e) = std::fs::write(&config.output_file, serialized) {
        log::error!(
            "Error writing merged report to {}: {}",
            config.output_file.display(),
            e
        );
        return Ok(exitcode::IOERR);
    }
    log::info!("Tests written to {}", config.output_file.display());

    if let Some(post_run) = config.post_run.as_ref().filter(|cmd| !cmd.is_empty()) {
        log::info!("Running post-run command: {}", post_run);
        if let Err(e) = post_run.execute() {
            log::error!("Error running post-run command: {:?}", e);
        }
    }

    Ok(exitcode::OK)
}

/// Parses every file in `paths`, in order, leaving out the ones that fail.
pub fn read_reports<T: AsRef<Path>>(paths: &[T]) -> Vec<TestSuites> {
    paths
        .iter()
        .filter_map(|path| {
            let path = path.as_ref();
            let data = match std::fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("Error reading report file {}: {}", path.display(), e);
                    return None;
                }
            };
            match context::junit::parse(data) {
                Ok(report) => Some(report),
                Err(e) => {
                    log::warn!("Error parsing report file {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect()
}
