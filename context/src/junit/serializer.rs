//! Writes a [`TestSuites`] back out as flat JUnit XML.

use std::{io, time::Duration};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use thiserror::Error;

use super::model::{DetailPayload, TestCase, TestCaseDetail, TestSuite, TestSuites};

static TESTSUITES_TAG: &str = "testsuites";
static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";
static SYSTEM_OUT_TAG: &str = "system-out";
static SYSTEM_ERR_TAG: &str = "system-err";

const INDENT_SIZE: usize = 2;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("error writing JUnit report: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("error writing JUnit report: {0}")]
    Io(#[from] io::Error),
    #[error("serialized JUnit report is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl TestSuites {
    /// Writes the report, preceded by an XML declaration and followed by a newline.
    ///
    /// Counters are written as they are; call [`TestSuites::compute`] first if the suites were
    /// modified by hand.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_report(self, writer)
    }

    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf = Vec::new();
        self.serialize(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

fn serialize_report(report: &TestSuites, writer: impl io::Write) -> Result<(), SerializeError> {
    let mut writer = Writer::new_with_indent(writer, b' ', INDENT_SIZE);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;

    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuites {
        name,
        tests,
        failures,
        errors,
        skipped,
        time,
        test_suites,
    } = report;

    let mut testsuites_tag = BytesStart::new(TESTSUITES_TAG);
    if let Some(name) = name {
        testsuites_tag.push_attribute(("name", name.as_str()));
    }
    push_counters(&mut testsuites_tag, *tests, *failures, *errors, *skipped);
    if let Some(time) = time {
        testsuites_tag.push_attribute(("time", serialize_time(time).as_str()));
    }
    writer.write_event(Event::Start(testsuites_tag))?;

    for test_suite in test_suites {
        serialize_test_suite(test_suite, &mut writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TESTSUITES_TAG)))?;
    writer.get_mut().write_all(b"\n")?;

    Ok(())
}

fn serialize_test_suite(
    test_suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestSuite {
        name,
        tests,
        failures,
        errors,
        skipped,
        time,
        timestamp,
        test_cases,
        system_out,
        system_err,
    } = test_suite;

    let mut testsuite_tag = BytesStart::new(TESTSUITE_TAG);
    testsuite_tag.push_attribute(("name", name.as_str()));
    push_counters(&mut testsuite_tag, *tests, *failures, *errors, *skipped);
    if let Some(time) = time {
        testsuite_tag.push_attribute(("time", serialize_time(time).as_str()));
    }
    if let Some(timestamp) = timestamp {
        testsuite_tag.push_attribute(("timestamp", timestamp.as_str()));
    }

    if test_cases.is_empty() && system_out.is_none() && system_err.is_none() {
        writer.write_event(Event::Empty(testsuite_tag))?;
        return Ok(());
    }
    writer.write_event(Event::Start(testsuite_tag))?;

    for test_case in test_cases {
        serialize_test_case(test_case, writer)?;
    }
    if let Some(system_out) = system_out {
        serialize_text(SYSTEM_OUT_TAG, system_out, writer)?;
    }
    if let Some(system_err) = system_err {
        serialize_text(SYSTEM_ERR_TAG, system_err, writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TESTSUITE_TAG)))?;
    Ok(())
}

fn serialize_test_case(
    test_case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let TestCase {
        name,
        classname,
        time,
        detail,
        status,
        system_out,
        system_err,
    } = test_case;

    let mut testcase_tag = BytesStart::new(TESTCASE_TAG);
    testcase_tag.push_attribute(("name", name.as_str()));
    if let Some(classname) = classname {
        testcase_tag.push_attribute(("classname", classname.as_str()));
    }
    if let Some(time) = time {
        testcase_tag.push_attribute(("time", serialize_time(time).as_str()));
    }
    if let Some(status) = status {
        testcase_tag.push_attribute(("status", status.as_str()));
    }

    let detail = match detail {
        TestCaseDetail::Absent => None,
        TestCaseDetail::Failure(payload) => Some((FAILURE_TAG, payload)),
        TestCaseDetail::Error(payload) => Some((ERROR_TAG, payload)),
        TestCaseDetail::Skipped(payload) => Some((SKIPPED_TAG, payload)),
    };

    if detail.is_none() && system_out.is_none() && system_err.is_none() {
        writer.write_event(Event::Empty(testcase_tag))?;
        return Ok(());
    }
    writer.write_event(Event::Start(testcase_tag))?;

    if let Some((tag_name, payload)) = detail {
        serialize_detail(tag_name, payload, writer)?;
    }
    if let Some(system_out) = system_out {
        serialize_text(SYSTEM_OUT_TAG, system_out, writer)?;
    }
    if let Some(system_err) = system_err {
        serialize_text(SYSTEM_ERR_TAG, system_err, writer)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TESTCASE_TAG)))?;
    Ok(())
}

fn serialize_detail(
    tag_name: &'static str,
    payload: &DetailPayload,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    let DetailPayload {
        message,
        ty,
        description,
    } = payload;

    let mut tag = BytesStart::new(tag_name);
    if let Some(message) = message {
        tag.push_attribute(("message", message.as_str()));
    }
    if let Some(ty) = ty {
        tag.push_attribute(("type", ty.as_str()));
    }

    match description {
        Some(description) => {
            writer.write_event(Event::Start(tag))?;
            writer.write_event(Event::Text(BytesText::new(description)))?;
            writer.write_event(Event::End(BytesEnd::new(tag_name)))?;
        }
        None => writer.write_event(Event::Empty(tag))?,
    }
    Ok(())
}

fn serialize_text(
    tag_name: &'static str,
    text: &str,
    writer: &mut Writer<impl io::Write>,
) -> Result<(), SerializeError> {
    writer.write_event(Event::Start(BytesStart::new(tag_name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag_name)))?;
    Ok(())
}

fn push_counters(
    tag: &mut BytesStart,
    tests: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
) {
    tag.push_attribute(("tests", tests.to_string().as_str()));
    tag.push_attribute(("failures", failures.to_string().as_str()));
    tag.push_attribute(("errors", errors.to_string().as_str()));
    tag.push_attribute(("skipped", skipped.to_string().as_str()));
}

fn serialize_time(time: &Duration) -> String {
    format!("{:.3}", time.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::junit::model::{DetailPayload, TestCase, TestCaseDetail, TestSuite, TestSuites};

    #[test]
    fn serialize_empty_report() {
        let report = TestSuites::new();
        assert_eq!(
            report.to_string().unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <testsuites tests=\"0\" failures=\"0\" errors=\"0\" skipped=\"0\">\n\
             </testsuites>\n"
        );
    }

    #[test]
    fn serialize_escapes_text_and_attributes() {
        let mut payload = DetailPayload::with_message("expected <1> & got \"2\"");
        payload.set_type("AssertionError").set_description("left < right");
        let mut test_case = TestCase::new("compares");
        test_case
            .set_classname("example.Test")
            .set_time(Duration::from_millis(1250))
            .set_detail(TestCaseDetail::Failure(payload));
        let mut test_suite = TestSuite::new("Suite");
        test_suite.add_test_case(test_case);
        let mut report = TestSuites::new();
        report.add_test_suite(test_suite);
        report.compute();

        let xml = report.to_string().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("tests=\"1\" failures=\"1\" errors=\"0\" skipped=\"0\""));
        assert!(xml.contains("time=\"1.250\""));
        assert!(xml.contains("message=\"expected &lt;1&gt; &amp; got &quot;2&quot;\""));
        assert!(xml.contains("type=\"AssertionError\""));
        assert!(xml.contains("left &lt; right"));
        assert!(xml.ends_with("</testsuites>\n"));
    }

    #[test]
    fn serialize_keeps_status_attribute() {
        let mut test_case = TestCase::new("flaky");
        test_case.set_status("failed");
        let mut test_suite = TestSuite::new("Suite");
        test_suite.add_test_case(test_case);
        let mut report = TestSuites::new();
        report.add_test_suite(test_suite);
        report.compute();

        let xml = report.to_string().unwrap();

        assert!(xml.contains("<testcase name=\"flaky\" status=\"failed\"/>"));
        assert!(xml.contains("failures=\"1\""));
    }
}
