pub mod aggregator;
pub mod classifier;
pub mod merger;
pub mod model;
pub mod parser;
pub mod serializer;

pub use merger::{merge, merge_with_policy, MergePolicy};
pub use model::{DetailPayload, TestCase, TestCaseDetail, TestSuite, TestSuites};
pub use parser::{JunitParser, ParseError};
pub use serializer::SerializeError;

/// Parses a single JUnit XML document into a [`TestSuites`] with recomputed counters.
pub fn parse<T: AsRef<[u8]>>(xml: T) -> Result<TestSuites, ParseError> {
    JunitParser::new().parse(xml.as_ref())
}
