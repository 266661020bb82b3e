// File system writer - one JSON file per result in a results directory

use super::{ResultsWriter, validate_source};
use crate::error::{Error, Result};
use crate::model::{
    TEST_RESULT_CONTAINER_FILE_SUFFIX, TEST_RESULT_FILE_SUFFIX, TestResult, TestResultContainer,
};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct FileSystemResultsWriter {
    output_dir: PathBuf,
    clean: bool,
    cleaned: AtomicBool,
}

impl FileSystemResultsWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            clean: false,
            cleaned: AtomicBool::new(false),
        }
    }

    /// Remove the output directory once before the first write
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn prepare_dir(&self) -> Result<()> {
        if self.clean
            && self
                .cleaned
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            && self.output_dir.exists()
        {
            tracing::debug!("Cleaning results directory {}", self.output_dir.display());
            fs::remove_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))
    }

    fn write_json<T: Serialize>(&self, file_name: String, value: &T) -> Result<()> {
        self.prepare_dir()?;
        let path = self.output_dir.join(file_name);
        let file = fs::File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value).map_err(|e| Error::json(&path, e))?;
        writer.flush().map_err(|e| Error::io(&path, e))?;
        tracing::debug!("Wrote {}", path.display());
        Ok(())
    }
}

pub fn test_result_file_name(uuid: &str) -> String {
    format!("{}{}", uuid, TEST_RESULT_FILE_SUFFIX)
}

pub fn container_file_name(uuid: &str) -> String {
    format!("{}{}", uuid, TEST_RESULT_CONTAINER_FILE_SUFFIX)
}

impl ResultsWriter for FileSystemResultsWriter {
    fn write_test_result(&self, result: &TestResult) -> Result<()> {
        self.write_json(test_result_file_name(&result.uuid), result)
    }

    fn write_container(&self, container: &TestResultContainer) -> Result<()> {
        self.write_json(container_file_name(&container.uuid), container)
    }

    fn write_attachment(&self, source: &str, content: &[u8]) -> Result<()> {
        validate_source(source)?;
        self.prepare_dir()?;
        let path = self.output_dir.join(source);
        fs::write(&path, content).map_err(|e| Error::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(test_result_file_name("abc"), "abc-result.json");
        assert_eq!(container_file_name("abc"), "abc-container.json");
    }

    #[test]
    fn test_writes_result_file() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let out = dir.path().join("nested").join("allure-results");
        let writer = FileSystemResultsWriter::new(&out);

        writer
            .write_test_result(&TestResult::new("r1").with_name("login"))
            .expect("write failed");

        let content = fs::read_to_string(out.join("r1-result.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["name"], "login");
    }

    #[test]
    fn test_clean_removes_stale_files_once() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let out = dir.path().to_path_buf();
        fs::write(out.join("stale-result.json"), "{}").unwrap();

        let writer = FileSystemResultsWriter::new(&out).with_clean(true);
        writer.write_attachment("a-attachment.txt", b"one").unwrap();
        writer.write_attachment("b-attachment.txt", b"two").unwrap();

        assert!(!out.join("stale-result.json").exists());
        assert!(out.join("a-attachment.txt").exists());
        assert!(out.join("b-attachment.txt").exists());
    }

    #[test]
    fn test_rejects_path_like_source() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let writer = FileSystemResultsWriter::new(dir.path());
        let err = writer.write_attachment("../x", b"data").unwrap_err();
        assert!(matches!(err, Error::InvalidSource(_)));
    }
}
