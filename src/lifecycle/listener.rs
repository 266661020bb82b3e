// Lifecycle listeners - observe and adjust entities around each transition

use crate::model::{FixtureResult, StepResult, TestResult, TestResultContainer};
use crate::utils::panic_message;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Transition a listener is notified about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Schedule,
    Start,
    Update,
    Stop,
    Write,
}

#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    TestCase(&'a TestResult),
    Container(&'a TestResultContainer),
    Fixture(&'a FixtureResult),
    Step(&'a StepResult),
}

#[derive(Debug)]
pub enum EntityMut<'a> {
    TestCase(&'a mut TestResult),
    Container(&'a mut TestResultContainer),
    Fixture(&'a mut FixtureResult),
    Step(&'a mut StepResult),
}

impl EntityMut<'_> {
    pub fn reborrow(&mut self) -> EntityMut<'_> {
        match self {
            EntityMut::TestCase(r) => EntityMut::TestCase(r),
            EntityMut::Container(c) => EntityMut::Container(c),
            EntityMut::Fixture(f) => EntityMut::Fixture(f),
            EntityMut::Step(s) => EntityMut::Step(s),
        }
    }
}

/// Hooks called around every lifecycle transition
///
/// `before` may modify the entity. Hooks may call back into the lifecycle:
/// attachments and steps added to the entity being notified land once the
/// hook returns, while updates of that same entity are skipped with a warning.
pub trait LifecycleListener: Send + Sync {
    fn before(&self, _phase: Phase, _entity: EntityMut<'_>) {}

    fn after(&self, _phase: Phase, _entity: EntityRef<'_>) {}
}

#[derive(Default, Clone)]
pub(crate) struct Notifier {
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl Notifier {
    pub(crate) fn new(listeners: Vec<Arc<dyn LifecycleListener>>) -> Self {
        Self { listeners }
    }

    pub(crate) fn before(&self, phase: Phase, mut entity: EntityMut<'_>) {
        for listener in &self.listeners {
            let entity = entity.reborrow();
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.before(phase, entity))) {
                tracing::error!(
                    "Lifecycle listener panicked before {:?}: {}",
                    phase,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    pub(crate) fn after(&self, phase: Phase, entity: EntityRef<'_>) {
        for listener in &self.listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.after(phase, entity))) {
                tracing::error!(
                    "Lifecycle listener panicked after {:?}: {}",
                    phase,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}
