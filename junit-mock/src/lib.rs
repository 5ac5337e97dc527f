use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use clap::Parser;
use context::junit::{DetailPayload, TestCase, TestCaseDetail, TestSuite, TestSuites};
use fake::Fake;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use rand::prelude::*;
use rand::rngs::StdRng;

const TAG_REPORT: &[u8] = b"testsuites";
const TAG_TEST_SUITE: &[u8] = b"testsuite";
const TAG_TEST_CASE: &[u8] = b"testcase";
const TAG_TEST_SUITE_STR: &str = "testsuite";

macro_rules! percentages_parser {
    ($func_name:ident, $num_percentages:literal) => {
        fn $func_name(argument: &str) -> std::result::Result<Vec<u8>, clap::Error> {
            argument
                .split(',')
                .enumerate()
                .try_fold((0_u8, Vec::new()), |mut acc, (i, percentage_str)| {
                    if i >= $num_percentages {
                        return Err(clap::Error::raw(
                            clap::error::ErrorKind::InvalidValue,
                            "More than $num_percentages percentages provided",
                        ));
                    }
                    let percentage = percentage_str
                        .parse::<u8>()
                        .map_err(|e| clap::Error::raw(clap::error::ErrorKind::InvalidValue, e))?;

                    if percentage > 100 {
                        return Err(clap::Error::raw(
                            clap::error::ErrorKind::InvalidValue,
                            format!("Percentage at index {} is greater than 100", i),
                        ));
                    }

                    acc.0 += percentage;

                    if acc.0 > 100 {
                        return Err(clap::Error::raw(
                            clap::error::ErrorKind::InvalidValue,
                            "Sum of percentages are greater than 100",
                        ));
                    }

                    acc.1.push(percentage);

                    Ok(acc)
                })
                .map(|v| v.1)
        }
    };
}

#[derive(Debug, Parser, Clone)]
pub struct Options {
    #[command(flatten, next_help_heading = "Global Options")]
    pub global: GlobalOptions,

    #[command(flatten, next_help_heading = "Report Options")]
    pub report: ReportOptions,

    #[command(flatten, next_help_heading = "Test Suite Options")]
    pub test_suite: TestSuiteOptions,

    #[command(flatten, next_help_heading = "Test Case Options")]
    pub test_case: TestCaseOptions,
}

impl Default for Options {
    fn default() -> Self {
        Options::try_parse_from([""]).unwrap()
    }
}

#[test]
fn options_can_be_defaulted_without_panicing() {
    Options::default();
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct GlobalOptions {
    /// Seed for all generated data, defaults to randomly generated seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Timestamp for all data to be based on, defaults to now
    #[arg(long)]
    pub timestamp: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct ReportOptions {
    /// The number of reports to generate
    #[arg(long, default_value = "1")]
    pub report_random_count: usize,

    /// Serialize single-suite reports with a `testsuite` root instead of `testsuites`
    #[arg(long)]
    pub do_not_render_testsuites_element: bool,
}

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct TestSuiteOptions {
    /// A list of test suite names to generate (conflicts with --test-suite-random-count)
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "test_suite_random_count"
    )]
    pub test_suite_names: Option<Vec<String>>,

    /// The number of test suites with random names to generate (conflicts with --test-suite-names)
    #[arg(long, conflicts_with = "test_suite_names", default_value = "5")]
    pub test_suite_random_count: usize,

    /// The chance of part of a test suite's cases being rendered inside a nested test suite
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "30")]
    pub test_suite_nested_percentage: u8,

    /// The chance of a system out message being added to the test suite
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "20")]
    pub test_suite_sys_out_percentage: u8,
}

percentages_parser!(four_percentages_parser, 4);

#[derive(Debug, Parser, Clone)]
#[group()]
pub struct TestCaseOptions {
    /// A list of test case names to generate (conflicts with --test-case-random-count, requires --test-case-classnames)
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "test_case_random_count",
        requires = "test_case_classnames"
    )]
    pub test_case_names: Option<Vec<String>>,

    /// A list of test case classnames to generate (conflicts with --test-case-random-count, requires --test-case-names)
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with = "test_case_random_count",
        requires = "test_case_names"
    )]
    pub test_case_classnames: Option<Vec<String>>,

    /// The number of test cases with random names to generate (conflicts with --test-case-names, --test-case-classnames)
    #[arg(long, conflicts_with_all = ["test_case_names", "test_case_classnames"], default_value = "10")]
    pub test_case_random_count: usize,

    /// The chance of a system out message being added to the test case
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "20")]
    pub test_case_sys_out_percentage: u8,

    /// Inclusive range of time between test case timestamps
    #[arg(long, num_args = 1..=2, value_names = ["DURATION_RANGE_START", "DURATION_RANGE_END"], default_values = ["30ms", "2s"])]
    pub test_case_duration_range: Vec<humantime::Duration>,

    /// The chance of a test case succeeding, skipping, failing, and erroring (must add up to 100)
    #[arg(long, value_parser = four_percentages_parser, default_value = "25,25,25,25")]
    pub test_case_success_to_skip_to_fail_to_error_percentage: Vec<Vec<u8>>,

    /// The chance of a test case outcome being written as a `status` attribute instead of a child element
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100), default_value = "25")]
    pub test_case_status_attribute_percentage: u8,
}

#[derive(Debug, Clone)]
pub struct JunitMock {
    seed: u64,
    options: Options,

    // state for generating reports
    rng: StdRng,
    timestamp: DateTime<FixedOffset>,
}

impl JunitMock {
    pub fn new(options: Options) -> Self {
        let (seed, rng) = JunitMock::rng_from_seed(&options);
        let timestamp = options.global.timestamp.unwrap_or_default();
        Self {
            seed,
            options,
            rng,
            timestamp,
        }
    }

    fn rng_from_seed(options: &Options) -> (u64, StdRng) {
        let seed = options.global.seed.unwrap_or_else(rand::random);
        (seed, StdRng::seed_from_u64(seed))
    }

    pub fn set_options(&mut self, options: Options) {
        let (seed, rng) = JunitMock::rng_from_seed(&options);
        self.seed = seed;
        self.rng = rng;
        self.options = options;
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    /// Generates flat reports with computed counters.
    pub fn generate_reports(&mut self) -> Vec<TestSuites> {
        self.timestamp = self
            .options
            .global
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().fixed_offset());

        (0..self.options.report.report_random_count)
            .map(|_| {
                let mut report = TestSuites::new();
                report.add_test_suites(self.generate_test_suites());
                let total = report
                    .test_suites
                    .iter()
                    .filter_map(|test_suite| test_suite.time)
                    .sum::<Duration>();
                report.set_time(total);
                report.compute();
                report
            })
            .collect()
    }

    /// Serializes `report`, moving the leading cases of some suites into a nested `testsuite`
    /// element the way some test runners do.
    pub fn render_report(&mut self, report: &TestSuites) -> Result<Vec<u8>> {
        let nesting: Vec<usize> = report
            .test_suites
            .iter()
            .map(|test_suite| {
                let count = test_suite.test_cases.len();
                if count > 0 && self.rand_bool(self.options.test_suite.test_suite_nested_percentage)
                {
                    self.rng.gen_range(1..=count)
                } else {
                    0
                }
            })
            .collect();
        let render_testsuites_element =
            !(self.options.report.do_not_render_testsuites_element && report.test_suites.len() == 1);

        let serialized_report = report.to_string()?;
        let mut reader = Reader::from_str(&serialized_report);
        reader.config_mut().trim_text(true);
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        let mut test_suite_index = 0;
        let mut nested_remaining = 0;
        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == TAG_REPORT => {
                    if render_testsuites_element {
                        writer.write_event(Event::Start(e))?;
                    }
                }
                Event::End(e) if e.name().as_ref() == TAG_REPORT => {
                    if render_testsuites_element {
                        writer.write_event(Event::End(e))?;
                    }
                }
                Event::Start(e) if e.name().as_ref() == TAG_TEST_SUITE => {
                    let nested_name = format!(
                        "{}.nested",
                        report.test_suites[test_suite_index].name
                    );
                    writer.write_event(Event::Start(e))?;
                    nested_remaining = nesting[test_suite_index];
                    if nested_remaining > 0 {
                        let mut nested = BytesStart::new(TAG_TEST_SUITE_STR);
                        nested.push_attribute(("name", nested_name.as_str()));
                        writer.write_event(Event::Start(nested))?;
                    }
                    test_suite_index += 1;
                }
                Event::Empty(e) if e.name().as_ref() == TAG_TEST_SUITE => {
                    writer.write_event(Event::Empty(e))?;
                    test_suite_index += 1;
                }
                Event::End(e) if e.name().as_ref() == TAG_TEST_CASE => {
                    writer.write_event(Event::End(e))?;
                    Self::close_nested_after_test_case(&mut writer, &mut nested_remaining)?;
                }
                Event::Empty(e) if e.name().as_ref() == TAG_TEST_CASE => {
                    writer.write_event(Event::Empty(e))?;
                    Self::close_nested_after_test_case(&mut writer, &mut nested_remaining)?;
                }
                Event::Eof => break,
                e => writer.write_event(e)?,
            }
        }

        let mut rendered = writer.into_inner();
        rendered.push(b'\n');
        Ok(rendered)
    }

    fn close_nested_after_test_case(
        writer: &mut Writer<Vec<u8>>,
        nested_remaining: &mut usize,
    ) -> Result<()> {
        if *nested_remaining > 0 {
            *nested_remaining -= 1;
            if *nested_remaining == 0 {
                writer.write_event(Event::End(BytesEnd::new(TAG_TEST_SUITE_STR)))?;
            }
        }
        Ok(())
    }

    /// Writes each report to `<directory>/<index>/test.xml`, mirroring a build tree's test logs.
    pub fn write_reports_to_dir<T: AsRef<Path>, U: AsRef<[TestSuites]>>(
        &mut self,
        directory: T,
        reports: U,
    ) -> Result<Vec<PathBuf>> {
        reports.as_ref().iter().enumerate().try_fold(
            Vec::new(),
            |mut acc, (i, report)| -> Result<Vec<PathBuf>> {
                let report_dir = directory.as_ref().join(format!("target-{:03}", i));
                fs::create_dir_all(&report_dir)?;
                let path = report_dir.join("test.xml");
                fs::write(&path, self.render_report(report)?)?;
                acc.push(path);
                Ok(acc)
            },
        )
    }

    fn generate_test_suites(&mut self) -> Vec<TestSuite> {
        self.options
            .test_suite
            .test_suite_names
            .as_ref()
            .cloned()
            .map(|mut test_suite_names| {
                test_suite_names.shuffle(&mut self.rng);
                test_suite_names
            })
            .unwrap_or_else(|| {
                (0..self.options.test_suite.test_suite_random_count)
                    .map(|i| {
                        let name: String =
                            fake::faker::company::en::Buzzword().fake_with_rng(&mut self.rng);
                        format!("{name}{i}")
                    })
                    .collect()
            })
            .iter()
            .map(|test_suite_name| -> TestSuite {
                let mut test_suite = TestSuite::new(test_suite_name);
                test_suite.set_timestamp(self.timestamp.to_rfc3339());
                test_suite.add_test_cases(false, self.generate_test_cases());
                let time = test_suite
                    .test_cases
                    .iter()
                    .filter_map(|test_case| test_case.time)
                    .sum::<Duration>();
                test_suite.set_time(time);
                self.timestamp += time;
                if self.rand_bool(self.options.test_suite.test_suite_sys_out_percentage) {
                    test_suite.set_system_out(self.fake_sentence());
                }
                test_suite
            })
            .collect()
    }

    fn generate_test_cases(&mut self) -> Vec<TestCase> {
        let classnames = self
            .options
            .test_case
            .test_case_classnames
            .as_ref()
            .cloned()
            .map(|mut test_case_classnames| {
                test_case_classnames.shuffle(&mut self.rng);
                test_case_classnames
            })
            .unwrap_or_else(|| {
                (0..self.options.test_case.test_case_random_count)
                    .map(|_| fake::faker::filesystem::en::DirPath().fake_with_rng(&mut self.rng))
                    .collect()
            });

        self.options
            .test_case
            .test_case_names
            .as_ref()
            .cloned()
            .map(|mut test_case_names| {
                test_case_names.shuffle(&mut self.rng);
                test_case_names
            })
            .unwrap_or_else(|| {
                (0..self.options.test_case.test_case_random_count)
                    .map(|i| {
                        let name: String =
                            fake::faker::company::en::Buzzword().fake_with_rng(&mut self.rng);
                        format!("{name}_{i}")
                    })
                    .collect()
            })
            .iter()
            .zip(classnames.iter())
            .map(|(test_case_name, test_case_classname)| -> TestCase {
                let mut test_case = TestCase::new(test_case_name);
                test_case.set_classname(test_case_classname);
                self.set_test_case_outcome(&mut test_case);
                if !test_case.is_skipped() {
                    let duration =
                        self.fake_duration(self.options.test_case.test_case_duration_range.clone());
                    test_case.set_time(duration);
                }
                if self.rand_bool(self.options.test_case.test_case_sys_out_percentage) {
                    test_case.set_system_out(self.fake_sentence());
                }
                test_case
            })
            .collect()
    }

    fn set_test_case_outcome(&mut self, test_case: &mut TestCase) {
        let as_status_attribute =
            self.rand_bool(self.options.test_case.test_case_status_attribute_percentage);
        let rand_percentage = self.rand_percentage();
        let mut total = 0_u8;
        for (i, percentage) in self
            .options
            .test_case
            .test_case_success_to_skip_to_fail_to_error_percentage
            .iter()
            .flatten()
            .enumerate()
        {
            let new_total = total + percentage;
            if (total..=new_total).contains(&rand_percentage) {
                if as_status_attribute {
                    let status = match i {
                        0 => "passed",
                        1 => "skipped",
                        2 if self.rng.gen_bool(0.5) => "failure",
                        2 => "failed",
                        3 => "error",
                        _ => unreachable!("only 4 percentages are valid"),
                    };
                    test_case.set_status(status);
                } else {
                    let payload = DetailPayload::with_message(self.fake_sentence());
                    let detail = match i {
                        0 => TestCaseDetail::Absent,
                        1 => TestCaseDetail::Skipped(payload),
                        2 => TestCaseDetail::Failure(payload),
                        3 => TestCaseDetail::Error(payload),
                        _ => unreachable!("only 4 percentages are valid"),
                    };
                    test_case.set_detail(detail);
                }
                return;
            }
            total = new_total;
        }
        unreachable!("invalid percentage of test case status")
    }

    fn fake_sentence(&mut self) -> String {
        let sentences: Vec<String> =
            fake::faker::lorem::en::Sentences(1..2).fake_with_rng(&mut self.rng);
        sentences.join(" ")
    }

    fn fake_duration<T: AsRef<[humantime::Duration]>>(&mut self, range: T) -> Duration {
        let range_start = range
            .as_ref()
            .first()
            .expect("must have start range for duration")
            .as_millis();
        let range_end = range
            .as_ref()
            .get(1)
            .map(|end| end.as_millis())
            .unwrap_or(range_start);
        let rand_duration_ms = self.rng.gen_range(range_start..=range_end);
        Duration::from_millis(rand_duration_ms as u64)
    }

    fn rand_bool<T: Into<f64>>(&mut self, percentage_chance: T) -> bool {
        self.rng.gen_bool(percentage_chance.into() / 100.0)
    }

    fn rand_percentage(&mut self) -> u8 {
        self.rng.gen_range(0..=100)
    }
}
