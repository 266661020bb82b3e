// Report module - persistence of finished results

pub mod fs;
pub mod memory;
pub mod reader;

use crate::error::Result;
use crate::model::{TestResult, TestResultContainer};
pub use fs::FileSystemResultsWriter;
pub use memory::InMemoryResultsWriter;
pub use reader::{AllureResults, FileSystemResultsReader};

/// Sink for finished results
///
/// The lifecycle calls it once per written entity; errors are logged by the
/// caller and never reach test code.
pub trait ResultsWriter: Send + Sync {
    /// Called when a test case is written
    fn write_test_result(&self, result: &TestResult) -> Result<()>;

    /// Called when a container is written
    fn write_container(&self, container: &TestResultContainer) -> Result<()>;

    /// Called with the bytes of an attachment under its source key
    fn write_attachment(&self, source: &str, content: &[u8]) -> Result<()>;
}

/// Attachment sources are stored as plain file names next to the results
pub(crate) fn validate_source(source: &str) -> Result<()> {
    if source.is_empty()
        || source == "."
        || source == ".."
        || source.contains(['/', '\\'])
    {
        return Err(crate::error::Error::InvalidSource(source.to_string()));
    }
    Ok(())
}
