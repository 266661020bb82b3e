// Object-safe view of the lifecycle for adapters that hold a `dyn` handle

use super::AllureLifecycle;
use crate::model::{FixtureKind, FixtureResult, StepResult, TestResult, TestResultContainer};

/// Lifecycle operations callable through a trait object
pub trait LifecycleSink: Send + Sync {
    fn schedule_test_case(&self, container: Option<&str>, result: TestResult);
    fn start_test_case(&self, uuid: &str);
    fn update_test_case(&self, uuid: &str, update: &mut dyn FnMut(&mut TestResult));
    fn stop_test_case(&self, uuid: &str);
    fn write_test_case(&self, uuid: &str);

    fn start_test_container(&self, parent: Option<&str>, container: TestResultContainer);
    fn update_test_container(&self, uuid: &str, update: &mut dyn FnMut(&mut TestResultContainer));
    fn stop_test_container(&self, uuid: &str);
    fn write_test_container(&self, uuid: &str);

    fn start_fixture(&self, container: &str, uuid: &str, kind: FixtureKind, fixture: FixtureResult);
    fn update_fixture(&self, uuid: &str, update: &mut dyn FnMut(&mut FixtureResult));
    fn stop_fixture(&self, uuid: &str);

    fn start_step(&self, parent: &str, uuid: &str, step: StepResult);
    fn update_step(&self, uuid: &str, update: &mut dyn FnMut(&mut StepResult));
    fn stop_step(&self, uuid: &str);

    fn current_test_case(&self) -> Option<String>;
}

impl LifecycleSink for AllureLifecycle {
    fn schedule_test_case(&self, container: Option<&str>, result: TestResult) {
        match container {
            Some(container) => AllureLifecycle::schedule_test_case_in(self, container, result),
            None => AllureLifecycle::schedule_test_case(self, result),
        }
    }

    fn start_test_case(&self, uuid: &str) {
        AllureLifecycle::start_test_case(self, uuid)
    }

    fn update_test_case(&self, uuid: &str, update: &mut dyn FnMut(&mut TestResult)) {
        AllureLifecycle::update_test_case(self, uuid, |r| update(r))
    }

    fn stop_test_case(&self, uuid: &str) {
        AllureLifecycle::stop_test_case(self, uuid)
    }

    fn write_test_case(&self, uuid: &str) {
        AllureLifecycle::write_test_case(self, uuid)
    }

    fn start_test_container(&self, parent: Option<&str>, container: TestResultContainer) {
        match parent {
            Some(parent) => AllureLifecycle::start_test_container_in(self, parent, container),
            None => AllureLifecycle::start_test_container(self, container),
        }
    }

    fn update_test_container(&self, uuid: &str, update: &mut dyn FnMut(&mut TestResultContainer)) {
        AllureLifecycle::update_test_container(self, uuid, |c| update(c))
    }

    fn stop_test_container(&self, uuid: &str) {
        AllureLifecycle::stop_test_container(self, uuid)
    }

    fn write_test_container(&self, uuid: &str) {
        AllureLifecycle::write_test_container(self, uuid)
    }

    fn start_fixture(&self, container: &str, uuid: &str, kind: FixtureKind, fixture: FixtureResult) {
        AllureLifecycle::start_fixture(self, container, uuid, kind, fixture)
    }

    fn update_fixture(&self, uuid: &str, update: &mut dyn FnMut(&mut FixtureResult)) {
        AllureLifecycle::update_fixture(self, uuid, |f| update(f))
    }

    fn stop_fixture(&self, uuid: &str) {
        AllureLifecycle::stop_fixture(self, uuid)
    }

    fn start_step(&self, parent: &str, uuid: &str, step: StepResult) {
        AllureLifecycle::start_step(self, parent, uuid, step)
    }

    fn update_step(&self, uuid: &str, update: &mut dyn FnMut(&mut StepResult)) {
        AllureLifecycle::update_step(self, uuid, |s| update(s))
    }

    fn stop_step(&self, uuid: &str) {
        AllureLifecycle::stop_step(self, uuid)
    }

    fn current_test_case(&self) -> Option<String> {
        AllureLifecycle::current_test_case(self)
    }
}
