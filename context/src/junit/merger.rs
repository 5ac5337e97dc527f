use std::time::Duration;

use super::model::{TestCase, TestSuite, TestSuites};

/// How a test case is added to a suite that may already hold a case with the same
/// `(name, classname)` key.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Last writer wins: an existing case with the same key is replaced in place.
    #[default]
    Unique,
    /// Every case is appended, so repeated runs of a test all show up.
    AppendAll,
}

impl MergePolicy {
    fn is_unique(self) -> bool {
        matches!(self, MergePolicy::Unique)
    }
}

impl TestSuite {
    /// Adds `test_cases` to this suite.
    ///
    /// With `unique` set, a case whose key matches an existing case overwrites that case at its
    /// position; otherwise it is appended. Without `unique`, everything is appended. Counters are
    /// not touched, call [`TestSuite::compute`] afterwards.
    pub fn add_test_cases(
        &mut self,
        unique: bool,
        test_cases: impl IntoIterator<Item = TestCase>,
    ) {
        for test_case in test_cases {
            if unique {
                if let Some(existing) = self
                    .test_cases
                    .iter_mut()
                    .find(|existing| existing.same_key(&test_case))
                {
                    *existing = test_case;
                    continue;
                }
            }
            self.test_cases.push(test_case);
        }
    }

    fn absorb(&mut self, policy: MergePolicy, other: &TestSuite) {
        self.add_test_cases(policy.is_unique(), other.test_cases.iter().cloned());
        self.time = sum_time(self.time, other.time);
        if self.timestamp.is_none() {
            self.timestamp.clone_from(&other.timestamp);
        }
        if self.system_out.is_none() {
            self.system_out.clone_from(&other.system_out);
        }
        if self.system_err.is_none() {
            self.system_err.clone_from(&other.system_err);
        }
    }
}

/// Folds `runs` in order into one report, replacing same-keyed cases (last writer wins).
pub fn merge<'a, I>(runs: I) -> TestSuites
where
    I: IntoIterator<Item = &'a TestSuites>,
{
    merge_with_policy(MergePolicy::Unique, runs)
}

/// Folds `runs` in order into one report.
///
/// Suites are matched by name. A suite seen for the first time is appended as is, so the
/// result lists suites in first-seen order. The inputs are left untouched and the returned
/// report has freshly computed counters.
pub fn merge_with_policy<'a, I>(policy: MergePolicy, runs: I) -> TestSuites
where
    I: IntoIterator<Item = &'a TestSuites>,
{
    let mut merged = runs
        .into_iter()
        .fold(TestSuites::new(), |mut merged, run| {
            merge_into(&mut merged, policy, run);
            merged
        });
    merged.compute();
    merged
}

fn merge_into(merged: &mut TestSuites, policy: MergePolicy, run: &TestSuites) {
    if merged.name.is_none() {
        merged.name.clone_from(&run.name);
    }
    merged.time = sum_time(merged.time, run.time);

    for test_suite in &run.test_suites {
        match merged
            .test_suites
            .iter_mut()
            .find(|existing| existing.name == test_suite.name)
        {
            Some(existing) => existing.absorb(policy, test_suite),
            None => merged.test_suites.push(test_suite.clone()),
        }
    }
}

fn sum_time(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
