use super::model::{TestCase, TestCaseDetail};

const STATUS_ERROR: &str = "error";
const STATUS_FAILURE: &str = "failure";
const STATUS_FAILED: &str = "failed";
const STATUS_SKIPPED: &str = "skipped";

/// Single-valued view of a test case, for display.
///
/// Counting never goes through this: a malformed case can be both a failure and an error, and
/// the counters see it as both.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TestCaseOutcome {
    Passed,
    Skipped,
    Failure,
    Error,
}

impl TestCase {
    pub fn is_error(&self) -> bool {
        matches!(self.detail, TestCaseDetail::Error(..)) || self.status_is(&[STATUS_ERROR])
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.detail, TestCaseDetail::Failure(..))
            || self.status_is(&[STATUS_FAILURE, STATUS_FAILED])
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.detail, TestCaseDetail::Skipped(..)) || self.status_is(&[STATUS_SKIPPED])
    }

    pub fn outcome(&self) -> TestCaseOutcome {
        if self.is_error() {
            TestCaseOutcome::Error
        } else if self.is_failure() {
            TestCaseOutcome::Failure
        } else if self.is_skipped() {
            TestCaseOutcome::Skipped
        } else {
            TestCaseOutcome::Passed
        }
    }

    // Exact, case-sensitive comparison.
    fn status_is(&self, values: &[&str]) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| values.contains(&status))
    }
}
