// Model module - Allure result data model
// Records produced by the lifecycle and consumed by results writers

pub mod metadata;
pub mod result;
pub mod status;

pub use metadata::{Attachment, Label, Link, Parameter, ParameterMode, label_names, link_types};
pub use result::{
    ExecutableItem, FixtureKind, FixtureResult, StepResult, TestResult, TestResultContainer,
};
pub use status::{Stage, Status, StatusDetails};

/// File name suffixes used in a results directory
pub const TEST_RESULT_FILE_SUFFIX: &str = "-result.json";
pub const TEST_RESULT_CONTAINER_FILE_SUFFIX: &str = "-container.json";
pub const ATTACHMENT_FILE_SUFFIX: &str = "-attachment";
