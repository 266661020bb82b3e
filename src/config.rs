// Configuration file handling

use crate::error::{Error, Result};
use crate::model::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub results: ResultsConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Link url patterns by link type, `{}` is replaced by the link name
    #[serde(default)]
    pub links: BTreeMap<String, String>,

    #[serde(default)]
    pub labels: LabelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsConfig {
    /// Directory results are written to
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Remove the directory once before the first write
    #[serde(default)]
    pub clean: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            clean: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LifecycleConfig {
    /// Status applied to steps stopped without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_step_status: Option<Status>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LabelsConfig {
    /// Fixed value for the host label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Fixed value for the thread label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
}

// Default values
pub const ENV_RESULTS_DIRECTORY: &str = "ALLURE_RESULTS_DIRECTORY";
pub const CONFIG_FILE_NAME: &str = "allure.toml";

pub fn default_directory() -> PathBuf {
    PathBuf::from("allure-results")
}

impl Config {
    /// Load configuration from default locations and apply environment overrides
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. ./allure.toml
        // 2. <config dir>/allure/allure.toml
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("allure").join(CONFIG_FILE_NAME));
        }

        let mut config = paths
            .iter()
            .find(|p| p.exists())
            .and_then(|p| match Self::load_from_file(p) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring configuration {}: {}", p.display(), e);
                    None
                }
            })?;
        config.apply_env();
        Some(config)
    }

    /// Configuration from default locations, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|| {
            let mut config = Self::default();
            config.apply_env();
            config
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_RESULTS_DIRECTORY)
            && !dir.is_empty()
        {
            self.results.directory = PathBuf::from(dir);
        }
    }

    /// Url pattern for a link type
    pub fn link_pattern(&self, link_type: &str) -> Option<&str> {
        self.links.get(link_type).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[results]
directory = "target/allure-results"
clean = true

[lifecycle]
default_step_status = "broken"

[links]
issue = "https://tracker.example.com/browse/{}"
tms = "https://tms.example.com/case/{}"

[labels]
host = "ci-runner-7"
"#;

        let config = Config::parse(toml).expect("Failed to parse config");
        assert_eq!(
            config.results.directory,
            PathBuf::from("target/allure-results")
        );
        assert!(config.results.clean);
        assert_eq!(config.lifecycle.default_step_status, Some(Status::Broken));
        assert_eq!(
            config.link_pattern("issue"),
            Some("https://tracker.example.com/browse/{}")
        );
        assert_eq!(config.labels.host.as_deref(), Some("ci-runner-7"));
        assert!(config.labels.thread.is_none());
    }

    #[test]
    fn test_parse_invalid_config() {
        let err = Config::parse("[results]\nclean = \"yes\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_to_toml_roundtrips_defaults() {
        let config = Config::default();
        let parsed = Config::parse(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }
}
