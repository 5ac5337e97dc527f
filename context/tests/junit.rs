use std::time::Duration;

use context::junit::{
    self, merge_with_policy, JunitParser, MergePolicy, ParseError, TestCaseDetail, TestSuites,
};
use junit_mock::JunitMock;
use pretty_assertions::assert_eq;

const NESTED_REPORT: &str = r#"
<testsuites time="15.682687">
    <testsuite name="Tests.Registration" time="6.605871">
        <testcase name="testCase1" classname="Tests.Registration" time="2.113871" />
        <testcase name="testCase2" classname="Tests.Registration" time="1.051" />
        <testcase name="testCase3" classname="Tests.Registration" time="3.441" />
    </testsuite>
    <testsuite name="Tests.Authentication" time="9.076816">
        <testsuite name="Tests.Authentication.Login" time="4.356">
            <testcase name="testCase4" classname="Tests.Authentication.Login" time="2.244" />
            <testcase name="testCase5" classname="Tests.Authentication.Login" time="0.781" />
            <testcase name="testCase6" classname="Tests.Authentication.Login" time="1.331" />
        </testsuite>
        <testcase name="testCase7" classname="Tests.Authentication" time="2.508" />
        <testcase name="testCase8" classname="Tests.Authentication" time="1.230816" />
        <testcase name="testCase9" classname="Tests.Authentication" time="0.982">
            <failure message="Assertion error message" type="AssertionError">
                <!-- Call stack printed here -->
            </failure>
        </testcase>
    </testsuite>
</testsuites>
"#;

fn counts(report: &TestSuites) -> (usize, usize, usize, usize) {
    (report.tests, report.failures, report.errors, report.skipped)
}

fn new_mock_junit_options(seed: u64, report_count: usize) -> junit_mock::Options {
    let mut options = junit_mock::Options::default();
    options.global.seed = Some(seed);
    options.report.report_random_count = report_count;
    options.test_suite.test_suite_random_count = 3;
    options.test_case.test_case_random_count = 8;
    options.test_case.test_case_duration_range =
        vec![Duration::from_millis(10).into(), Duration::from_secs(1).into()];
    options
}

#[test]
fn parse_flattens_nested_suites() {
    let report = junit::parse(NESTED_REPORT).unwrap();

    assert_eq!(report.test_suites.len(), 2);
    assert_eq!(report.time, Some(Duration::from_secs_f64(15.682687)));

    let suite = &report.test_suites[1];
    assert_eq!(suite.name, "Tests.Authentication");
    let names: Vec<&str> = suite.test_cases.iter().map(|tc| tc.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["testCase4", "testCase5", "testCase6", "testCase7", "testCase8", "testCase9"]
    );
    assert_eq!(
        suite.test_cases[0].classname.as_deref(),
        Some("Tests.Authentication.Login")
    );
    assert!(suite.test_cases[5].is_failure());
    let payload = suite.test_cases[5].detail.payload().unwrap();
    assert_eq!(payload.message.as_deref(), Some("Assertion error message"));
    assert_eq!(payload.ty.as_deref(), Some("AssertionError"));

    assert_eq!(counts(&report), (9, 1, 0, 0));
    assert_eq!((suite.tests, suite.failures), (6, 1));
}

#[test]
fn parse_counts_every_case_regardless_of_depth() {
    let xml = r#"<testsuites>
        <testsuite name="a">
            <testsuite name="a.b">
                <testsuite name="a.b.c">
                    <testcase name="deep"><error/></testcase>
                </testsuite>
                <testcase name="middle"><skipped/></testcase>
            </testsuite>
            <testcase name="top"/>
        </testsuite>
        <testsuite>
            <testsuite name="adopted">
                <testcase name="only"/>
            </testsuite>
        </testsuite>
    </testsuites>"#;

    let report = junit::parse(xml).unwrap();

    assert_eq!(report.test_suites.len(), 2);
    assert_eq!(report.test_suites[0].test_cases.len(), 3);
    assert_eq!(report.test_suites[1].name, "adopted");
    assert_eq!(counts(&report), (4, 0, 1, 1));
}

#[test]
fn parse_testsuite_root() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="pytest" tests="99" failures="42" time="0.5" timestamp="2024-01-01T00:00:00">
    <testcase name="test_a" classname="tests.test_mod" time="0.25"/>
    <testcase name="test_b" classname="tests.test_mod" time="0.25">
        <skipped message="not today"/>
    </testcase>
</testsuite>"#;

    let report = junit::parse(xml).unwrap();

    assert_eq!(report.name, None);
    assert_eq!(report.test_suites.len(), 1);
    let suite = &report.test_suites[0];
    assert_eq!(suite.name, "pytest");
    assert_eq!(suite.timestamp.as_deref(), Some("2024-01-01T00:00:00"));
    assert_eq!(suite.time, Some(Duration::from_millis(500)));
    assert_eq!((suite.tests, suite.failures, suite.skipped), (2, 0, 1));
}

#[test]
fn parse_status_attributes_and_cdata() {
    let xml = r#"<testsuites name="go">
    <testsuite name="pkg">
        <testcase name="a" status="failed"/>
        <testcase name="b" status="error"/>
        <testcase name="c" status="skipped"/>
        <testcase name="d" status="passed" classname=""/>
        <testcase name="e">
            <failure message="m"><![CDATA[x < y]]></failure>
            <system-out><![CDATA[<stdout>]]></system-out>
            <system-err>warn &amp; more</system-err>
        </testcase>
        <system-out>suite output</system-out>
    </testsuite>
</testsuites>"#;

    let report = junit::parse(xml).unwrap();

    assert_eq!(report.name.as_deref(), Some("go"));
    assert_eq!(counts(&report), (5, 2, 1, 1));
    let suite = &report.test_suites[0];
    assert_eq!(suite.system_out.as_deref(), Some("suite output"));
    assert_eq!(suite.test_cases[3].classname, None);
    assert_eq!(suite.test_cases[3].status.as_deref(), Some("passed"));
    assert!(!suite.test_cases[3].is_failure());

    let e = &suite.test_cases[4];
    match &e.detail {
        TestCaseDetail::Failure(payload) => {
            assert_eq!(payload.message.as_deref(), Some("m"));
            assert_eq!(payload.description.as_deref(), Some("x < y"));
        }
        other => panic!("expected failure detail, got {:?}", other),
    }
    assert_eq!(e.system_out.as_deref(), Some("<stdout>"));
    assert_eq!(e.system_err.as_deref(), Some("warn & more"));
}

#[test]
fn parse_ignores_unparsable_time() {
    let xml = r#"<testsuite name="s" time="soon"><testcase name="t" time="-1"/></testsuite>"#;

    let report = junit::parse(xml).unwrap();

    assert_eq!(report.test_suites[0].time, None);
    assert_eq!(report.test_suites[0].test_cases[0].time, None);
}

#[test]
fn parse_rejects_documents_without_a_report_root() {
    for xml in ["", "   \n", "<?xml version=\"1.0\"?>", "<html><body/></html>", "<testcase/>"] {
        assert!(
            matches!(junit::parse(xml), Err(ParseError::RootNotFound)),
            "{:?} should have no root",
            xml
        );
    }
}

#[test]
fn parse_rejects_malformed_documents() {
    let mismatched = r#"<testsuites><testsuite name="a"></testcase></testsuites>"#;
    assert!(matches!(
        junit::parse(mismatched),
        Err(ParseError::Xml(_))
    ));

    let truncated = r#"<testsuites><testsuite name="a"><testcase name="t"/>"#;
    assert!(matches!(
        junit::parse(truncated),
        Err(ParseError::UnexpectedEof | ParseError::Xml(_))
    ));

    let cut_mid_tag = r#"<testsuites><testsuite name="a"><testca"#;
    assert!(junit::parse(cut_mid_tag).is_err());
}

#[test]
fn parser_reads_from_buf_read() {
    let report = JunitParser::new()
        .parse(std::io::BufReader::new(NESTED_REPORT.as_bytes()))
        .unwrap();

    assert_eq!(report.tests, 9);
}

#[test]
fn serialize_then_parse_preserves_counts() {
    let report = junit::parse(NESTED_REPORT).unwrap();

    let reparsed = junit::parse(report.to_string().unwrap()).unwrap();

    assert_eq!(counts(&reparsed), counts(&report));
    assert_eq!(reparsed.test_suites.len(), report.test_suites.len());
    assert_eq!(
        reparsed.test_suites[1].test_cases[5].detail,
        report.test_suites[1].test_cases[5].detail
    );
}

#[test]
fn serialize_then_parse_mock_reports_with_nesting() {
    let mut options = new_mock_junit_options(1234, 3);
    options.test_suite.test_suite_nested_percentage = 100;
    let mut jm = JunitMock::new(options);
    let reports = jm.generate_reports();

    for report in &reports {
        let rendered = jm.render_report(report).unwrap();
        assert!(String::from_utf8_lossy(&rendered).contains(".nested\">"));

        let parsed = junit::parse(&rendered).unwrap();

        assert_eq!(
            counts(&parsed),
            counts(report),
            "seed {} did not round trip",
            jm.get_seed()
        );
        assert_eq!(parsed.test_suites.len(), report.test_suites.len());
    }
}

#[test]
fn parse_mock_report_without_testsuites_element() {
    let mut options = new_mock_junit_options(99, 1);
    options.test_suite.test_suite_random_count = 1;
    options.report.do_not_render_testsuites_element = true;
    let mut jm = JunitMock::new(options);
    let reports = jm.generate_reports();

    let rendered = jm.render_report(&reports[0]).unwrap();
    assert!(!String::from_utf8_lossy(&rendered).contains("<testsuites"));

    let parsed = junit::parse(&rendered).unwrap();
    assert_eq!(counts(&parsed), counts(&reports[0]));
}

#[test]
fn merge_append_all_keeps_every_mock_case() {
    let mut jm = JunitMock::new(new_mock_junit_options(42, 4));
    let reports = jm.generate_reports();

    let merged = merge_with_policy(MergePolicy::AppendAll, &reports);

    assert_eq!(
        merged.tests,
        reports.iter().map(|report| report.tests).sum::<usize>()
    );
    assert_eq!(
        merged.failures,
        reports.iter().map(|report| report.failures).sum::<usize>()
    );
}

#[test]
fn merge_same_report_twice_is_idempotent() {
    let mut jm = JunitMock::new(new_mock_junit_options(7, 1));
    let reports = jm.generate_reports();

    let merged = junit::merge([&reports[0], &reports[0]]);

    assert_eq!(counts(&merged), counts(&reports[0]));
    assert_eq!(merged.test_suites.len(), reports[0].test_suites.len());
}
