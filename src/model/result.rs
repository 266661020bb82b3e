// Result records: test cases, steps, fixtures and containers

use super::metadata::{Attachment, Label, Link, Parameter};
use super::status::{Stage, Status, StatusDetails};
use serde::{Deserialize, Serialize};

/// Shared accessors for everything that has a status, timing, steps and attachments
pub trait ExecutableItem {
    fn stage(&self) -> Stage;
    fn set_stage(&mut self, stage: Stage);
    fn set_stop(&mut self, millis: i64);
    fn steps_mut(&mut self) -> &mut Vec<StepResult>;
    fn attachments_mut(&mut self) -> &mut Vec<Attachment>;
}

macro_rules! impl_executable_item {
    ($ty:ty) => {
        impl ExecutableItem for $ty {
            fn stage(&self) -> Stage {
                self.stage
            }
            fn set_stage(&mut self, stage: Stage) {
                self.stage = stage;
            }
            fn set_stop(&mut self, millis: i64) {
                self.stop = Some(millis);
            }
            fn steps_mut(&mut self) -> &mut Vec<StepResult> {
                &mut self.steps
            }
            fn attachments_mut(&mut self) -> &mut Vec<Attachment> {
                &mut self.attachments
            }
        }
    };
}

/// A named, timed unit of work; steps nest arbitrarily deep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    /// Uuid of the running step this entry stands in for
    #[serde(skip)]
    pub(crate) placeholder: Option<String>,
}

impl StepResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub(crate) fn placeholder_of(&self, uuid: &str) -> Self {
        Self {
            placeholder: Some(uuid.to_string()),
            ..self.clone()
        }
    }

    pub(crate) fn is_placeholder_of(&self, uuid: &str) -> bool {
        self.placeholder.as_deref() == Some(uuid)
    }
}

impl_executable_item!(StepResult);

/// One execution of a before/after hook of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    /// Uuid of the running fixture this entry stands in for
    #[serde(skip)]
    pub(crate) placeholder: Option<String>,
}

impl FixtureResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn placeholder_of(&self, uuid: &str) -> Self {
        Self {
            placeholder: Some(uuid.to_string()),
            ..self.clone()
        }
    }

    pub(crate) fn is_placeholder_of(&self, uuid: &str) -> bool {
        self.placeholder.as_deref() == Some(uuid)
    }
}

impl_executable_item!(FixtureResult);

/// One logical test execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerun_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepResult>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

impl TestResult {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_history_id(mut self, history_id: impl Into<String>) -> Self {
        self.history_id = Some(history_id.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// First value of the label with the given name
    pub fn label_value(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

impl_executable_item!(TestResult);

/// Which fixture list of a container a fixture belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    /// Setup hook, recorded in `befores`
    Prepare,
    /// Teardown hook, recorded in `afters`
    TearDown,
}

impl FixtureKind {
    pub fn fixtures_mut(self, container: &mut TestResultContainer) -> &mut Vec<FixtureResult> {
        match self {
            FixtureKind::Prepare => &mut container.befores,
            FixtureKind::TearDown => &mut container.afters,
        }
    }
}

/// Groups test cases with their before/after fixtures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultContainer {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Uuids of child test cases and nested containers
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(default)]
    pub befores: Vec<FixtureResult>,
    #[serde(default)]
    pub afters: Vec<FixtureResult>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

impl TestResultContainer {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_child(mut self, uuid: impl Into<String>) -> Self {
        self.children.push(uuid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_result_uses_camel_case_fields() {
        let result = TestResult::new("u-1")
            .with_name("login")
            .with_full_name("auth::login")
            .with_history_id("abc");
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["uuid"], "u-1");
        assert_eq!(value["historyId"], "abc");
        assert_eq!(value["fullName"], "auth::login");
        assert_eq!(value["stage"], "scheduled");
        assert!(value.get("statusDetails").is_none());
        assert!(value["steps"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_nested_steps_deserialize() {
        let json = r#"{
            "name": "outer",
            "status": "passed",
            "stage": "finished",
            "steps": [{"name": "inner", "stage": "finished", "steps": []}]
        }"#;
        let step: StepResult = serde_json::from_str(json).unwrap();
        assert_eq!(step.steps.len(), 1);
        assert_eq!(step.steps[0].name.as_deref(), Some("inner"));
        assert!(step.steps[0].status.is_none());
    }

    #[test]
    fn test_executable_item_accessors() {
        let mut fixture = FixtureResult::new("setUp");
        fixture.set_stage(Stage::Running);
        fixture.set_stop(7);
        fixture.steps_mut().push(StepResult::new("open db"));

        assert_eq!(fixture.stage(), Stage::Running);
        assert_eq!(fixture.stop, Some(7));
        assert_eq!(fixture.steps.len(), 1);
    }

    #[test]
    fn test_placeholder_is_not_serialized() {
        let step = StepResult::new("login").placeholder_of("s-1");
        assert!(step.is_placeholder_of("s-1"));
        assert!(!step.is_placeholder_of("s-2"));

        let value = serde_json::to_value(&step).unwrap();
        assert!(value.get("placeholder").is_none());
        let back: StepResult = serde_json::from_value(value).unwrap();
        assert!(!back.is_placeholder_of("s-1"));
    }

    #[test]
    fn test_label_value_lookup() {
        let result = TestResult::new("u").with_label(Label::new("suite", "auth"));
        assert_eq!(result.label_value("suite"), Some("auth"));
        assert_eq!(result.label_value("feature"), None);
    }

    #[test]
    fn test_attachment_type_field_name() {
        let attachment = Attachment {
            name: Some("body".to_string()),
            source: "x-attachment.json".to_string(),
            content_type: Some("application/json".to_string()),
        };
        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["type"], "application/json");
    }
}
