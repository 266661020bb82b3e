// In-memory writer - keeps written results for inspection

use super::{ResultsWriter, validate_source};
use crate::error::Result;
use crate::model::{TestResult, TestResultContainer};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct InMemoryResultsWriter {
    test_results: Mutex<Vec<TestResult>>,
    containers: Mutex<Vec<TestResultContainer>>,
    attachments: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryResultsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Written test results, in write order
    pub fn test_results(&self) -> Vec<TestResult> {
        self.test_results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn containers(&self) -> Vec<TestResultContainer> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attachments(&self) -> BTreeMap<String, Vec<u8>> {
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn test_result(&self, uuid: &str) -> Option<TestResult> {
        self.test_results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.uuid == uuid)
            .cloned()
    }

    pub fn container(&self, uuid: &str) -> Option<TestResultContainer> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned()
    }

    pub fn attachment(&self, source: &str) -> Option<Vec<u8>> {
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }
}

impl ResultsWriter for InMemoryResultsWriter {
    fn write_test_result(&self, result: &TestResult) -> Result<()> {
        self.test_results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());
        Ok(())
    }

    fn write_container(&self, container: &TestResultContainer) -> Result<()> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(container.clone());
        Ok(())
    }

    fn write_attachment(&self, source: &str, content: &[u8]) -> Result<()> {
        validate_source(source)?;
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), content.to_vec());
        Ok(())
    }
}
