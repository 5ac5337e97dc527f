use super::model::{TestSuite, TestSuites};

impl TestSuite {
    /// Recounts `tests`, `failures`, `errors` and `skipped` from the current test cases.
    pub fn compute(&mut self) {
        self.tests = self.test_cases.len();
        self.failures = self.test_cases.iter().filter(|tc| tc.is_failure()).count();
        self.errors = self.test_cases.iter().filter(|tc| tc.is_error()).count();
        self.skipped = self.test_cases.iter().filter(|tc| tc.is_skipped()).count();
    }
}

impl TestSuites {
    /// Recomputes every suite, then sums the suite counters.
    pub fn compute(&mut self) {
        self.tests = 0;
        self.failures = 0;
        self.errors = 0;
        self.skipped = 0;

        for test_suite in self.test_suites.iter_mut() {
            test_suite.compute();
            self.tests += test_suite.tests;
            self.failures += test_suite.failures;
            self.errors += test_suite.errors;
            self.skipped += test_suite.skipped;
        }
    }
}
