// Convenience calls for test code: steps, labels, links, parameters

use super::AllureLifecycle;
use crate::model::{Label, Parameter, Status, StatusDetails, StepResult, label_names, link_types};
use crate::utils::{create_link, status_from_panic};
use std::fmt::{Debug, Display};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use uuid::Uuid;

/// Run `f` as a step of whatever is current on this thread
///
/// `Ok` marks the step passed and `Err` broken. A panic marks it failed and
/// keeps unwinding. Without a running test case `f` just runs.
pub fn step<T, E, F>(lifecycle: &AllureLifecycle, name: &str, f: F) -> Result<T, E>
where
    E: Display + Debug,
    F: FnOnce() -> Result<T, E>,
{
    if lifecycle.current_test_case_or_step().is_none() {
        return f();
    }

    let uuid = Uuid::new_v4().to_string();
    lifecycle.start_step_in_current(&uuid, StepResult::new(name));

    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => {
            lifecycle.update_step(&uuid, |s| s.status = Some(Status::Passed));
            lifecycle.stop_step(&uuid);
            Ok(value)
        }
        Ok(Err(e)) => {
            let details = StatusDetails::default()
                .with_message(e.to_string())
                .with_trace(format!("{:?}", e));
            lifecycle.update_step(&uuid, |s| {
                s.status = Some(Status::Broken);
                s.status_details = Some(details);
            });
            lifecycle.stop_step(&uuid);
            Err(e)
        }
        Err(payload) => {
            let (status, details) = status_from_panic(payload.as_ref());
            lifecycle.update_step(&uuid, |s| {
                s.status = Some(status);
                s.status_details = Some(details);
            });
            lifecycle.stop_step(&uuid);
            resume_unwind(payload)
        }
    }
}

/// A step with no body
pub fn log_step(lifecycle: &AllureLifecycle, name: &str, status: Status) {
    let uuid = Uuid::new_v4().to_string();
    lifecycle.start_step_in_current(&uuid, StepResult::new(name).with_status(status));
    lifecycle.stop_step(&uuid);
}

pub fn label(lifecycle: &AllureLifecycle, name: &str, value: &str) {
    let label = Label::new(name, value);
    lifecycle.update_current_test_case(|r| r.labels.push(label));
}

pub fn epic(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::EPIC, value);
}

pub fn feature(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::FEATURE, value);
}

pub fn story(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::STORY, value);
}

pub fn suite(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::SUITE, value);
}

pub fn owner(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::OWNER, value);
}

pub fn severity(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::SEVERITY, value);
}

pub fn tag(lifecycle: &AllureLifecycle, value: &str) {
    label(lifecycle, label_names::TAG, value);
}

pub fn description(lifecycle: &AllureLifecycle, text: &str) {
    let text = text.to_string();
    lifecycle.update_current_test_case(|r| r.description = Some(text));
}

pub fn description_html(lifecycle: &AllureLifecycle, html: &str) {
    let html = html.to_string();
    lifecycle.update_current_test_case(|r| r.description_html = Some(html));
}

/// Link with an explicit url
pub fn link(lifecycle: &AllureLifecycle, name: &str, url: &str) {
    add_link(lifecycle, Some(name), Some(url), Some(link_types::CUSTOM));
}

/// Issue link; the url comes from the configured `issue` pattern
pub fn issue(lifecycle: &AllureLifecycle, name: &str) {
    add_link(lifecycle, Some(name), None, Some(link_types::ISSUE));
}

/// Test management link; the url comes from the configured `tms` pattern
pub fn tms(lifecycle: &AllureLifecycle, name: &str) {
    add_link(lifecycle, Some(name), None, Some(link_types::TMS));
}

fn add_link(
    lifecycle: &AllureLifecycle,
    name: Option<&str>,
    url: Option<&str>,
    link_type: Option<&str>,
) {
    let link = create_link(None, name, url, link_type, lifecycle.config());
    lifecycle.update_current_test_case(|r| r.links.push(link));
}

/// Record a parameter and hand the value back
pub fn parameter<T: Display>(lifecycle: &AllureLifecycle, name: &str, value: T) -> T {
    let parameter = Parameter::new(name, value.to_string());
    match lifecycle.current_step() {
        Some(step) => lifecycle.update_step(&step, |s| s.parameters.push(parameter)),
        None => lifecycle.update_current_test_case(|r| r.parameters.push(parameter)),
    }
    value
}

/// Plain text attachment
pub fn attachment(lifecycle: &AllureLifecycle, name: &str, content: &str) {
    lifecycle.add_attachment(name, "text/plain", "txt", content.as_bytes());
}
