use std::io::Write;
use std::path::PathBuf;

use bazel_run_reporter::{
    merge::{
        run_merge, MergeConfig, DEFAULT_OUTPUT_FILE, DEFAULT_REPORT_FILE_NAME, DEFAULT_TESTLOGS_DIR,
    },
    post_run::PostRunCommand,
};
use clap::Parser;
use context::junit::MergePolicy;

#[derive(Debug, Parser)]
#[command(
    version = std::env!("CARGO_PKG_VERSION"),
    name = "bazel-run-reporter",
    about = "Merge the JUnit reports of a test run into a single report"
)]
struct Cli {
    #[arg(
        long,
        env = "TESTLOGS_DIR",
        default_value = DEFAULT_TESTLOGS_DIR,
        help = "Directory containing the report files."
    )]
    testlogs_dir: PathBuf,
    #[arg(
        long,
        default_value = DEFAULT_OUTPUT_FILE,
        help = "Output file for the merged test results."
    )]
    output_file: PathBuf,
    #[arg(
        long,
        default_value = DEFAULT_REPORT_FILE_NAME,
        value_parser = clap::builder::NonEmptyStringValueParser::new(),
        help = "File name of the reports to collect."
    )]
    report_file_name: String,
    #[arg(long, help = "Command to run after the test results are merged.")]
    post_run: Option<String>,
    #[arg(
        long,
        help = "Keep every run of a test case instead of only the last one."
    )]
    append_duplicates: bool,
    #[arg(long, help = "Suppress log output.")]
    silent: bool,
}

impl Cli {
    fn merge_config(self) -> anyhow::Result<MergeConfig> {
        let Cli {
            testlogs_dir,
            output_file,
            report_file_name,
            post_run,
            append_duplicates,
            ..
        } = self;

        Ok(MergeConfig {
            testlogs_dir,
            output_file,
            report_file_name,
            merge_policy: if append_duplicates {
                MergePolicy::AppendAll
            } else {
                MergePolicy::Unique
            },
            post_run: post_run.map(PostRunCommand::new).transpose()?,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.silent)?;

    let config = match cli.merge_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(exitcode::USAGE);
        }
    };

    match run_merge(&config) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            log::error!("Error: {:?}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

fn setup_logger(silent: bool) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if silent {
                log::LevelFilter::Off
            } else {
                log::LevelFilter::Info
            },
        );
    if let Ok(log) = std::env::var("REPORTER_LOG") {
        if !silent {
            builder.parse_filters(&log);
        }
    }
    builder.init();
    Ok(())
}
