// Results reader - loads a results directory back into the model

use crate::error::{Error, Result};
use crate::model::{
    TEST_RESULT_CONTAINER_FILE_SUFFIX, TEST_RESULT_FILE_SUFFIX, TestResult, TestResultContainer,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything found in a results directory
#[derive(Debug, Default, Clone)]
pub struct AllureResults {
    pub test_results: Vec<TestResult>,
    pub containers: Vec<TestResultContainer>,
    pub attachments: BTreeMap<String, Vec<u8>>,
}

impl AllureResults {
    pub fn test_result(&self, uuid: &str) -> Option<&TestResult> {
        self.test_results.iter().find(|r| r.uuid == uuid)
    }

    pub fn container(&self, uuid: &str) -> Option<&TestResultContainer> {
        self.containers.iter().find(|c| c.uuid == uuid)
    }
}

pub struct FileSystemResultsReader {
    dir: PathBuf,
}

impl FileSystemResultsReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(Error::io(
                &self.dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "results directory not found"),
            ));
        }

        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.dir)
            .max_depth(1)
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        files.sort();
        Ok(files)
    }

    /// All `*-result.json` files; unreadable ones are logged and skipped
    pub fn read_test_results(&self) -> Result<Vec<TestResult>> {
        self.read_with_suffix(TEST_RESULT_FILE_SUFFIX)
    }

    /// All `*-container.json` files; unreadable ones are logged and skipped
    pub fn read_containers(&self) -> Result<Vec<TestResultContainer>> {
        self.read_with_suffix(TEST_RESULT_CONTAINER_FILE_SUFFIX)
    }

    pub fn read_attachment(&self, source: &str) -> Result<Vec<u8>> {
        super::validate_source(source)?;
        let path = self.dir.join(source);
        std::fs::read(&path).map_err(|e| Error::io(&path, e))
    }

    pub fn read_all(&self) -> Result<AllureResults> {
        let test_results = self.read_test_results()?;
        let containers = self.read_containers()?;

        let mut attachments = BTreeMap::new();
        let sources = test_results
            .iter()
            .flat_map(|r| {
                let mut sources = Vec::new();
                collect_sources(&r.attachments, &r.steps, &mut sources);
                sources
            })
            .chain(containers.iter().flat_map(|c| {
                let mut sources = Vec::new();
                for fixture in c.befores.iter().chain(&c.afters) {
                    collect_sources(&fixture.attachments, &fixture.steps, &mut sources);
                }
                sources
            }));
        for source in sources {
            match self.read_attachment(&source) {
                Ok(bytes) => {
                    attachments.insert(source, bytes);
                }
                Err(e) => tracing::warn!("Skipping attachment {}: {}", source, e),
            }
        }

        Ok(AllureResults {
            test_results,
            containers,
            attachments,
        })
    }

    fn read_with_suffix<T: DeserializeOwned>(&self, suffix: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for path in self.files()? {
            if !file_name_ends_with(&path, suffix) {
                continue;
            }
            match read_json(&path) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(items)
    }
}

fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&content).map_err(|e| Error::json(path, e))
}

fn collect_sources(
    attachments: &[crate::model::Attachment],
    steps: &[crate::model::StepResult],
    out: &mut Vec<String>,
) {
    out.extend(attachments.iter().map(|a| a.source.clone()));
    for step in steps {
        collect_sources(&step.attachments, &step.steps, out);
    }
}
