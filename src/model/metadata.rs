// Labels, links, parameters and attachment references

use serde::{Deserialize, Serialize};

/// Well-known label names
pub mod label_names {
    pub const EPIC: &str = "epic";
    pub const FEATURE: &str = "feature";
    pub const STORY: &str = "story";
    pub const SUITE: &str = "suite";
    pub const PARENT_SUITE: &str = "parentSuite";
    pub const SUB_SUITE: &str = "subSuite";
    pub const PACKAGE: &str = "package";
    pub const TAG: &str = "tag";
    pub const OWNER: &str = "owner";
    pub const SEVERITY: &str = "severity";
    pub const HOST: &str = "host";
    pub const THREAD: &str = "thread";
    pub const FRAMEWORK: &str = "framework";
    pub const LANGUAGE: &str = "language";
}

/// Well-known link types
pub mod link_types {
    pub const ISSUE: &str = "issue";
    pub const TMS: &str = "tms";
    pub const CUSTOM: &str = "custom";
}

/// Key-value metadata on a test result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

/// How a parameter value is rendered in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    #[default]
    Default,
    Hidden,
    Masked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    /// Excluded parameters do not take part in history id calculation
    #[serde(default)]
    pub excluded: bool,
    #[serde(default)]
    pub mode: ParameterMode,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            excluded: false,
            mode: ParameterMode::Default,
        }
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn with_mode(mut self, mode: ParameterMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Attachment metadata; `source` is the key the bytes are stored under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}
