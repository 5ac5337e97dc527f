use std::time::Duration;

/// The root of a JUnit report: an ordered collection of test suites.
///
/// The `tests`, `failures`, `errors` and `skipped` counters are derived from the suites and are
/// only meaningful after [`TestSuites::compute`] has run. The parser and the merger both do this
/// before handing a value back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestSuites {
    pub name: Option<String>,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub time: Option<Duration>,
    pub test_suites: Vec<TestSuite>,
}

impl TestSuites {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    pub fn add_test_suite(&mut self, test_suite: TestSuite) -> &mut Self {
        self.test_suites.push(test_suite);
        self
    }

    pub fn add_test_suites(
        &mut self,
        test_suites: impl IntoIterator<Item = TestSuite>,
    ) -> &mut Self {
        self.test_suites.extend(test_suites);
        self
    }

    pub fn test_suite(&self, name: &str) -> Option<&TestSuite> {
        self.test_suites.iter().find(|suite| suite.name == name)
    }

    /// Every test case of every suite, in suite order.
    pub fn test_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.test_suites
            .iter()
            .flat_map(|suite| suite.test_cases.iter())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestSuite {
    pub name: String,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub time: Option<Duration>,
    pub timestamp: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub system_out: Option<String>,
    pub system_err: Option<String>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    pub fn set_timestamp(&mut self, timestamp: impl Into<String>) -> &mut Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn set_system_out(&mut self, system_out: impl Into<String>) -> &mut Self {
        self.system_out = Some(system_out.into());
        self
    }

    pub fn set_system_err(&mut self, system_err: impl Into<String>) -> &mut Self {
        self.system_err = Some(system_err.into());
        self
    }

    pub fn add_test_case(&mut self, test_case: TestCase) -> &mut Self {
        self.test_cases.push(test_case);
        self
    }
}

/// A single test execution, keyed by `(name, classname)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub classname: Option<String>,
    pub time: Option<Duration>,
    pub detail: TestCaseDetail,
    /// Free-form `status` attribute some producers emit instead of (or next to) a detail element.
    pub status: Option<String>,
    pub system_out: Option<String>,
    pub system_err: Option<String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_classname(&mut self, classname: impl Into<String>) -> &mut Self {
        self.classname = Some(classname.into());
        self
    }

    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = Some(time);
        self
    }

    pub fn set_detail(&mut self, detail: TestCaseDetail) -> &mut Self {
        self.detail = detail;
        self
    }

    pub fn set_status(&mut self, status: impl Into<String>) -> &mut Self {
        self.status = Some(status.into());
        self
    }

    pub fn set_system_out(&mut self, system_out: impl Into<String>) -> &mut Self {
        self.system_out = Some(system_out.into());
        self
    }

    pub fn set_system_err(&mut self, system_err: impl Into<String>) -> &mut Self {
        self.system_err = Some(system_err.into());
        self
    }

    /// Two cases with the same key describe the same test.
    pub fn same_key(&self, other: &TestCase) -> bool {
        self.name == other.name && self.classname == other.classname
    }
}

/// The classifying child element of a `testcase`, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TestCaseDetail {
    #[default]
    Absent,
    Failure(DetailPayload),
    Error(DetailPayload),
    Skipped(DetailPayload),
}

impl TestCaseDetail {
    pub fn payload(&self) -> Option<&DetailPayload> {
        match self {
            TestCaseDetail::Absent => None,
            TestCaseDetail::Failure(payload)
            | TestCaseDetail::Error(payload)
            | TestCaseDetail::Skipped(payload) => Some(payload),
        }
    }

    pub(crate) fn payload_mut(&mut self) -> Option<&mut DetailPayload> {
        match self {
            TestCaseDetail::Absent => None,
            TestCaseDetail::Failure(payload)
            | TestCaseDetail::Error(payload)
            | TestCaseDetail::Skipped(payload) => Some(payload),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DetailPayload {
    pub message: Option<String>,
    pub ty: Option<String>,
    pub description: Option<String>,
}

impl DetailPayload {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }
}
