// Status, stage and status details of executable items

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a test case, step or fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
            Status::Skipped => "skipped",
            Status::Unknown => "unknown",
        }
    }

    /// Failed and broken results count as unsuccessful
    pub fn is_unsuccessful(&self) -> bool {
        matches!(self, Status::Failed | Status::Broken)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "broken" => Ok(Self::Broken),
            "skipped" => Ok(Self::Skipped),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!(
                "Unknown status: {}. Supported: passed, failed, broken, skipped, unknown",
                other
            )),
        }
    }
}

/// Execution stage of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Scheduled,
    Running,
    Finished,
    Pending,
    Interrupted,
}

impl Stage {
    /// Position in the scheduled -> running -> finished progression
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Scheduled | Stage::Pending => 0,
            Stage::Running => 1,
            Stage::Finished | Stage::Interrupted => 2,
        }
    }

    /// Whether moving from `self` to `next` would go backwards
    pub fn regresses_to(&self, next: Stage) -> bool {
        next.rank() < self.rank()
    }
}

/// Failure details attached to a status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDetails {
    #[serde(default)]
    pub known: bool,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub flaky: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl StatusDetails {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn with_flaky(mut self, flaky: bool) -> Self {
        self.flaky = flaky;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_known(mut self, known: bool) -> Self {
        self.known = known;
        self
    }
}
