use std::{io::BufRead, ops::ControlFlow};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use thiserror::Error;

use super::model::{DetailPayload, TestCase, TestCaseDetail, TestSuite, TestSuites};

const TAG_REPORT: &[u8] = b"testsuites";
const TAG_TEST_SUITE: &[u8] = b"testsuite";
const TAG_TEST_CASE: &[u8] = b"testcase";
const TAG_TEST_CASE_DETAIL_FAILURE: &[u8] = b"failure";
const TAG_TEST_CASE_DETAIL_ERROR: &[u8] = b"error";
const TAG_TEST_CASE_DETAIL_SKIPPED: &[u8] = b"skipped";
const TAG_SYSTEM_OUT: &[u8] = b"system-out";
const TAG_SYSTEM_ERR: &[u8] = b"system-err";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid UTF-8 in CDATA section: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("no testsuites or testsuite root element found")]
    RootNotFound,
    #[error("document ended before the root element was closed")]
    UnexpectedEof,
}

#[derive(Debug, Clone, Copy)]
enum TextKind {
    SystemOut,
    SystemErr,
}

#[derive(Debug, Clone)]
struct Text {
    kind: TextKind,
    value: String,
}

/// Event-driven JUnit reader.
///
/// Nested `testsuite` elements are flattened while reading: when a nested suite closes, its test
/// cases are appended to the enclosing suite, so the returned report only has the top-level
/// suites, each holding every case found beneath it.
#[derive(Debug, Clone, Default)]
pub struct JunitParser {
    depth: usize,
    report: Option<TestSuites>,
    open_test_suites: Vec<TestSuite>,
    current_test_case: Option<TestCase>,
    in_test_case_detail: bool,
    current_text: Option<Text>,
}

impl JunitParser {
    pub fn new() -> Self {
        Default::default()
    }

    /// Reads one document. Counters found in the document are discarded and recomputed.
    pub fn parse<R: BufRead>(mut self, xml: R) -> Result<TestSuites, ParseError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            if self
                .match_event(reader.read_event_into(&mut buf)?)?
                .is_break()
            {
                break;
            }
            buf.clear();
        }

        let mut report = self.report.take().ok_or(ParseError::RootNotFound)?;
        report.compute();
        Ok(report)
    }

    fn match_event(&mut self, event: Event) -> Result<ControlFlow<()>, ParseError> {
        match event {
            Event::Eof => {
                if self.depth > 0 {
                    return Err(ParseError::UnexpectedEof);
                }
                return Ok(ControlFlow::Break(()));
            }
            Event::Start(e) => {
                self.open_element(&e)?;
                self.depth += 1;
            }
            Event::Empty(e) => {
                self.open_element(&e)?;
                self.close_element(e.name().as_ref());
                if self.depth == 0 {
                    return Ok(ControlFlow::Break(()));
                }
            }
            Event::End(e) => {
                self.close_element(e.name().as_ref());
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    return Ok(ControlFlow::Break(()));
                }
            }
            Event::CData(e) => {
                self.match_text(std::str::from_utf8(&e)?);
            }
            Event::Text(e) => {
                self.match_text(&e.unescape()?);
            }
            _ => (),
        };
        Ok(ControlFlow::Continue(()))
    }

    fn open_element(&mut self, e: &BytesStart) -> Result<(), ParseError> {
        let is_root = self.depth == 0;
        match e.name().as_ref() {
            TAG_REPORT if is_root => self.open_report(e)?,
            TAG_TEST_SUITE => {
                if is_root {
                    self.report = Some(TestSuites::new());
                }
                self.open_test_suite(e)?;
            }
            _ if is_root => return Err(ParseError::RootNotFound),
            TAG_TEST_CASE => self.open_test_case(e)?,
            TAG_TEST_CASE_DETAIL_FAILURE
            | TAG_TEST_CASE_DETAIL_ERROR
            | TAG_TEST_CASE_DETAIL_SKIPPED => self.set_test_case_detail(e)?,
            TAG_SYSTEM_OUT => self.open_text(TextKind::SystemOut),
            TAG_SYSTEM_ERR => self.open_text(TextKind::SystemErr),
            _ => (),
        };
        Ok(())
    }

    fn close_element(&mut self, name: &[u8]) {
        match name {
            TAG_TEST_SUITE => self.close_test_suite(),
            TAG_TEST_CASE => self.close_test_case(),
            TAG_TEST_CASE_DETAIL_FAILURE
            | TAG_TEST_CASE_DETAIL_ERROR
            | TAG_TEST_CASE_DETAIL_SKIPPED => self.in_test_case_detail = false,
            TAG_SYSTEM_OUT | TAG_SYSTEM_ERR => self.close_text(),
            _ => (),
        }
    }

    fn match_text(&mut self, text: &str) {
        if let Some(current_text) = self.current_text.as_mut() {
            current_text.value.push_str(text);
        } else if self.in_test_case_detail {
            if let Some(payload) = self
                .current_test_case
                .as_mut()
                .and_then(|test_case| test_case.detail.payload_mut())
            {
                payload
                    .description
                    .get_or_insert_with(String::new)
                    .push_str(text);
            }
        }
    }

    fn open_report(&mut self, e: &BytesStart) -> Result<(), ParseError> {
        let mut report = TestSuites::new();
        if let Some(name) = parse_attr::name(e)? {
            report.set_name(name);
        }
        if let Some(time) = parse_attr::time(e)? {
            report.set_time(time);
        }
        self.report = Some(report);
        Ok(())
    }

    fn open_test_suite(&mut self, e: &BytesStart) -> Result<(), ParseError> {
        let mut test_suite = TestSuite::new(parse_attr::name(e)?.unwrap_or_default());

        if let Some(time) = parse_attr::time(e)? {
            test_suite.set_time(time);
        }

        if let Some(timestamp) = parse_attr::timestamp(e)? {
            test_suite.set_timestamp(timestamp);
        }

        self.open_test_suites.push(test_suite);
        Ok(())
    }

    fn close_test_suite(&mut self) {
        let Some(test_suite) = self.open_test_suites.pop() else {
            return;
        };

        if let Some(parent) = self.open_test_suites.last_mut() {
            hoist_nested_test_suite(parent, test_suite);
        } else if let Some(report) = self.report.as_mut() {
            report.add_test_suite(test_suite);
        }
    }

    fn open_test_case(&mut self, e: &BytesStart) -> Result<(), ParseError> {
        let mut test_case = TestCase::new(parse_attr::name(e)?.unwrap_or_default());

        if let Some(classname) = parse_attr::classname(e)? {
            test_case.set_classname(classname);
        }

        if let Some(time) = parse_attr::time(e)? {
            test_case.set_time(time);
        }

        if let Some(status) = parse_attr::status(e)? {
            test_case.set_status(status);
        }

        self.current_test_case = Some(test_case);
        Ok(())
    }

    fn close_test_case(&mut self) {
        let Some(test_case) = self.current_test_case.take() else {
            return;
        };

        match self.open_test_suites.last_mut() {
            Some(test_suite) => {
                test_suite.add_test_case(test_case);
            }
            None => log::debug!(
                "ignoring test case `{}` found outside of a test suite",
                test_case.name
            ),
        }
    }

    fn set_test_case_detail(&mut self, e: &BytesStart) -> Result<(), ParseError> {
        let Some(test_case) = self.current_test_case.as_mut() else {
            return Ok(());
        };

        let mut payload = DetailPayload::new();
        if let Some(message) = parse_attr::message(e)? {
            payload.set_message(message);
        }
        if let Some(r#type) = parse_attr::r#type(e)? {
            payload.set_type(r#type);
        }

        test_case.detail = match e.name().as_ref() {
            TAG_TEST_CASE_DETAIL_FAILURE => TestCaseDetail::Failure(payload),
            TAG_TEST_CASE_DETAIL_ERROR => TestCaseDetail::Error(payload),
            _ => TestCaseDetail::Skipped(payload),
        };
        self.in_test_case_detail = true;
        Ok(())
    }

    fn open_text(&mut self, kind: TextKind) {
        self.current_text = Some(Text {
            kind,
            value: String::new(),
        });
    }

    fn close_text(&mut self) {
        let Some(Text { kind, value }) = self.current_text.take() else {
            return;
        };
        if value.is_empty() {
            return;
        }

        let (system_out, system_err) = if let Some(test_case) = self.current_test_case.as_mut() {
            (&mut test_case.system_out, &mut test_case.system_err)
        } else if let Some(test_suite) = self.open_test_suites.last_mut() {
            (&mut test_suite.system_out, &mut test_suite.system_err)
        } else {
            return;
        };

        match kind {
            TextKind::SystemOut => append_text(system_out, value),
            TextKind::SystemErr => append_text(system_err, value),
        }
    }
}

fn hoist_nested_test_suite(parent: &mut TestSuite, nested: TestSuite) {
    let TestSuite {
        name,
        test_cases,
        system_out,
        system_err,
        ..
    } = nested;

    if parent.name.is_empty() {
        parent.name = name;
    }
    parent.test_cases.extend(test_cases);
    if let Some(system_out) = system_out {
        append_text(&mut parent.system_out, system_out);
    }
    if let Some(system_err) = system_err {
        append_text(&mut parent.system_err, system_err);
    }
}

fn append_text(target: &mut Option<String>, value: String) {
    match target {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(&value);
        }
        None => *target = Some(value),
    }
}

mod parse_attr {
    use std::{str::FromStr, time::Duration};

    use quick_xml::events::BytesStart;

    use super::ParseError;

    pub fn name(e: &BytesStart) -> Result<Option<String>, ParseError> {
        parse_string_attr(e, "name")
    }

    pub fn classname(e: &BytesStart) -> Result<Option<String>, ParseError> {
        Ok(parse_string_attr(e, "classname")?.filter(|classname| !classname.is_empty()))
    }

    pub fn status(e: &BytesStart) -> Result<Option<String>, ParseError> {
        parse_string_attr(e, "status")
    }

    pub fn timestamp(e: &BytesStart) -> Result<Option<String>, ParseError> {
        parse_string_attr(e, "timestamp")
    }

    pub fn message(e: &BytesStart) -> Result<Option<String>, ParseError> {
        parse_string_attr(e, "message")
    }

    pub fn r#type(e: &BytesStart) -> Result<Option<String>, ParseError> {
        parse_string_attr(e, "type")
    }

    /// `time` is decimal seconds. Values that are not a finite, non-negative number are dropped.
    pub fn time(e: &BytesStart) -> Result<Option<Duration>, ParseError> {
        let Some(seconds) = parse_string_attr_into_other_type::<f64>(e, "time")? else {
            return Ok(None);
        };
        let time = Duration::try_from_secs_f64(seconds).ok();
        if time.is_none() {
            log::debug!("ignoring out of range time attribute `{}`", seconds);
        }
        Ok(time)
    }

    fn parse_string_attr(
        e: &BytesStart,
        attr_name: &'static str,
    ) -> Result<Option<String>, ParseError> {
        match e.try_get_attribute(attr_name)? {
            Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
            None => Ok(None),
        }
    }

    fn parse_string_attr_into_other_type<T: FromStr>(
        e: &BytesStart,
        attr_name: &'static str,
    ) -> Result<Option<T>, ParseError> {
        Ok(parse_string_attr(e, attr_name)?.and_then(|value| {
            let parsed = value.trim().parse::<T>().ok();
            if parsed.is_none() {
                log::debug!("ignoring unparsable {} attribute `{}`", attr_name, value);
            }
            parsed
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::JunitParser;

    #[test]
    fn parse_empty_testsuites_root() {
        let report = JunitParser::new().parse(&b"<testsuites/>"[..]).unwrap();
        assert!(report.test_suites.is_empty());
        assert_eq!(report.tests, 0);
    }

    #[test]
    fn parse_stops_after_root() {
        let xml = b"<testsuite name=\"a\"><testcase name=\"t\"/></testsuite><garbage";
        let report = JunitParser::new().parse(&xml[..]).unwrap();
        assert_eq!(report.tests, 1);
    }

    #[test]
    fn nested_suite_output_is_appended_to_parent() {
        let xml = br#"<testsuite name="outer">
            <system-out>outer</system-out>
            <testsuite name="inner">
                <testcase name="t"/>
                <system-out>inner</system-out>
            </testsuite>
        </testsuite>"#;
        let report = JunitParser::new().parse(&xml[..]).unwrap();
        let suite = &report.test_suites[0];
        assert_eq!(suite.name, "outer");
        assert_eq!(suite.system_out.as_deref(), Some("outer\ninner"));
        assert_eq!(suite.test_cases.len(), 1);
    }

    #[test]
    fn last_detail_element_wins() {
        let xml = br#"<testsuite name="s">
            <testcase name="t"><failure message="first"/><error message="second"/></testcase>
        </testsuite>"#;
        let report = JunitParser::new().parse(&xml[..]).unwrap();
        let test_case = &report.test_suites[0].test_cases[0];
        assert!(test_case.is_error());
        assert!(!test_case.is_failure());
    }
}
