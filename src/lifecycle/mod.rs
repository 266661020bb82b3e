// Lifecycle module - the test-result lifecycle recorder
//
// Framework adapters drive an `AllureLifecycle` with schedule/start/update/
// stop/write calls. The recorder never returns errors or panics into the
// caller: unknown uuids and failing mutators are logged and ignored.

pub mod attachments;
pub mod facade;
pub mod global;
pub mod listener;
pub mod sink;

pub use global::{get, set};
pub use listener::{EntityMut, EntityRef, LifecycleListener, Phase};
pub use sink::LifecycleSink;

use crate::config::Config;
use crate::model::{
    ExecutableItem, FixtureKind, FixtureResult, Stage, Status, StepResult, TestResult,
    TestResultContainer,
};
use crate::report::{FileSystemResultsWriter, ResultsWriter};
use crate::state::context::{self, ContextGuard, Root, ThreadContext};
use crate::state::storage::{FixtureSlot, Item, Miss, Storage};
use crate::time::now_unix_millis;
use crate::utils::panic_message;
use listener::Notifier;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, error, warn};

static NEXT_LIFECYCLE_ID: AtomicU64 = AtomicU64::new(1);

/// Records test cases, containers, fixtures and steps until they are written
pub struct AllureLifecycle {
    id: u64,
    writer: Arc<dyn ResultsWriter>,
    storage: Storage,
    notifier: Notifier,
    config: Config,
}

#[derive(Default)]
pub struct LifecycleBuilder {
    writer: Option<Arc<dyn ResultsWriter>>,
    config: Option<Config>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl LifecycleBuilder {
    pub fn writer(mut self, writer: Arc<dyn ResultsWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Without an explicit writer results go to the configured directory
    pub fn build(self) -> AllureLifecycle {
        let config = self.config.unwrap_or_default();
        let writer = self.writer.unwrap_or_else(|| {
            Arc::new(
                FileSystemResultsWriter::new(&config.results.directory)
                    .with_clean(config.results.clean),
            )
        });
        AllureLifecycle {
            id: NEXT_LIFECYCLE_ID.fetch_add(1, Ordering::Relaxed),
            writer,
            storage: Storage::new(),
            notifier: Notifier::new(self.listeners),
            config,
        }
    }
}

fn run_guarded(kind: &str, uuid: &str, f: impl FnOnce()) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                "Update of {} {} panicked, keeping partial changes: {}",
                kind,
                uuid,
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

/// Run `f`, reverting any stage change that would go backwards
fn guard_stage<T: ExecutableItem>(kind: &str, uuid: &str, item: &mut T, f: impl FnOnce(&mut T)) {
    let stage = item.stage();
    f(&mut *item);
    if stage.regresses_to(item.stage()) {
        warn!(
            "Ignoring stage change of {} {} from {:?} to {:?}",
            kind,
            uuid,
            stage,
            item.stage()
        );
        item.set_stage(stage);
    }
}

fn finish<T: ExecutableItem>(item: &mut T, now: i64) {
    if item.stage().rank() < Stage::Finished.rank() {
        item.set_stage(Stage::Finished);
    }
    item.set_stop(now);
}

/// Replace the placeholder matched by `is_slot`; append when it is gone
fn fold<T>(entries: &mut Vec<T>, finished: T, is_slot: impl Fn(&T) -> bool) -> bool {
    match entries.iter_mut().find(|e| is_slot(e)) {
        Some(entry) => {
            *entry = finished;
            true
        }
        None => {
            entries.push(finished);
            false
        }
    }
}

impl AllureLifecycle {
    pub fn builder() -> LifecycleBuilder {
        LifecycleBuilder::default()
    }

    pub fn new(writer: Arc<dyn ResultsWriter>) -> Self {
        Self::builder().writer(writer).build()
    }

    /// Lifecycle writing to the directory named by `config`
    pub fn from_config(config: Config) -> Self {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn writer(&self) -> &Arc<dyn ResultsWriter> {
        &self.writer
    }

    /// Number of entities started or scheduled but not yet written
    pub fn in_flight(&self) -> usize {
        self.storage.count()
    }

    fn with_context<R>(&self, f: impl FnOnce(&mut ThreadContext) -> R) -> R {
        context::with_context(self.id, f)
    }

    fn read_context(&self, f: impl FnOnce(&ThreadContext) -> Option<&str>) -> Option<String> {
        context::read(self.id, |ctx| f(ctx).map(str::to_string))
    }

    // ── Test cases ─────────────────────────────────────────────────────

    /// Register a test case in the scheduled stage
    pub fn schedule_test_case(&self, mut result: TestResult) {
        if self.storage.contains(&result.uuid) {
            warn!(
                "Could not schedule test case: uuid {} is already registered",
                result.uuid
            );
            return;
        }
        self.notifier
            .before(Phase::Schedule, EntityMut::TestCase(&mut result));
        result.stage = Stage::Scheduled;

        let uuid = result.uuid.clone();
        if self.storage.insert(&uuid, Item::TestCase(result)).is_err() {
            warn!("Could not schedule test case: uuid {} is already registered", uuid);
            return;
        }
        let _ = self.storage.with_test_case(&uuid, |r| {
            self.notifier.after(Phase::Schedule, EntityRef::TestCase(r))
        });
        debug!("Scheduled test case {}", uuid);
    }

    /// Register a test case and add it to the children of a container
    pub fn schedule_test_case_in(&self, container_uuid: &str, result: TestResult) {
        if self.storage.contains(&result.uuid) {
            warn!(
                "Could not schedule test case: uuid {} is already registered",
                result.uuid
            );
            return;
        }
        self.link_child(container_uuid, &result.uuid);
        self.schedule_test_case(result);
    }

    fn link_child(&self, container_uuid: &str, child: &str) {
        let linked = self
            .storage
            .apply(container_uuid, child.to_string(), |entry, child| {
                if let Item::Container(c) = &mut entry.item {
                    c.children.push(child);
                }
            });
        if linked.is_err() {
            warn!(
                "Could not add {} to container {}: container not found",
                child, container_uuid
            );
        }
    }

    /// Move a scheduled test case to running and make it current on this thread
    pub fn start_test_case(&self, uuid: &str) {
        self.with_context(ThreadContext::clear_root);

        let now = now_unix_millis();
        let started = self.storage.with_test_case(uuid, |r| {
            if r.stage.rank() >= Stage::Finished.rank() {
                return false;
            }
            self.notifier.before(Phase::Start, EntityMut::TestCase(&mut *r));
            r.stage = Stage::Running;
            r.start.get_or_insert(now);
            self.notifier.after(Phase::Start, EntityRef::TestCase(r));
            true
        });

        match started {
            Ok(true) => {
                self.with_context(|ctx| ctx.start_root(Root::TestCase(uuid.to_string())));
                debug!("Started test case {}", uuid);
            }
            Ok(false) => warn!("Could not start test case {}: already finished", uuid),
            Err(miss) => warn!("Could not start test case {}: {}", uuid, miss),
        }
    }

    pub fn update_test_case(&self, uuid: &str, update: impl FnOnce(&mut TestResult)) {
        let updated = self.storage.with_test_case(uuid, |r| {
            guard_stage("test case", uuid, &mut *r, |r| {
                self.notifier.before(Phase::Update, EntityMut::TestCase(&mut *r));
                run_guarded("test case", uuid, || update(&mut *r));
            });
            self.notifier.after(Phase::Update, EntityRef::TestCase(r));
        });
        if let Err(miss) = updated {
            warn!("Could not update test case {}: {}", uuid, miss);
        }
    }

    /// Update the test case running on this thread
    pub fn update_current_test_case(&self, update: impl FnOnce(&mut TestResult)) {
        match self.current_test_case() {
            Some(uuid) => self.update_test_case(&uuid, update),
            None => warn!("Could not update test case: no test case running"),
        }
    }

    /// Finish a test case; it stays in memory until written
    pub fn stop_test_case(&self, uuid: &str) {
        self.await_attachments(uuid);

        let now = now_unix_millis();
        let stopped = self.storage.with_test_case(uuid, |r| {
            self.notifier.before(Phase::Stop, EntityMut::TestCase(&mut *r));
            finish(&mut *r, now);
            self.notifier.after(Phase::Stop, EntityRef::TestCase(r));
        });
        if let Err(miss) = stopped {
            warn!("Could not stop test case {}: {}", uuid, miss);
            return;
        }
        self.with_context(|ctx| ctx.finish_root(uuid));
        debug!("Stopped test case {}", uuid);
    }

    /// Hand a test case to the writer and forget it
    pub fn write_test_case(&self, uuid: &str) {
        let (mut result, pending) = match self.storage.take_test_case(uuid) {
            Ok(taken) => taken,
            Err(miss) => {
                warn!("Could not write test case {}: {}", uuid, miss);
                return;
            }
        };
        self.resolve_pending(pending);

        guard_stage("test case", uuid, &mut result, |r| {
            self.notifier.before(Phase::Write, EntityMut::TestCase(r))
        });
        if let Err(e) = self.writer.write_test_result(&result) {
            error!("Could not write test case {}: {}", uuid, e);
        }
        self.notifier.after(Phase::Write, EntityRef::TestCase(&result));
        debug!("Wrote test case {}", uuid);
    }

    // ── Containers ─────────────────────────────────────────────────────

    pub fn start_test_container(&self, mut container: TestResultContainer) {
        if self.storage.contains(&container.uuid) {
            warn!(
                "Could not start test container: uuid {} is already registered",
                container.uuid
            );
            return;
        }
        self.notifier
            .before(Phase::Start, EntityMut::Container(&mut container));
        container.start.get_or_insert_with(now_unix_millis);

        let uuid = container.uuid.clone();
        if self.storage.insert(&uuid, Item::Container(container)).is_err() {
            warn!("Could not start test container: uuid {} is already registered", uuid);
            return;
        }
        let _ = self.storage.with_container(&uuid, |c| {
            self.notifier.after(Phase::Start, EntityRef::Container(c))
        });
        self.with_context(|ctx| ctx.push_container(&uuid));
        debug!("Started test container {}", uuid);
    }

    /// Start a container nested in another one
    pub fn start_test_container_in(&self, parent_uuid: &str, container: TestResultContainer) {
        if self.storage.contains(&container.uuid) {
            warn!(
                "Could not start test container: uuid {} is already registered",
                container.uuid
            );
            return;
        }
        self.link_child(parent_uuid, &container.uuid);
        self.start_test_container(container);
    }

    pub fn update_test_container(
        &self,
        uuid: &str,
        update: impl FnOnce(&mut TestResultContainer),
    ) {
        let updated = self.storage.with_container(uuid, |c| {
            self.notifier.before(Phase::Update, EntityMut::Container(&mut *c));
            run_guarded("test container", uuid, || update(&mut *c));
            self.notifier.after(Phase::Update, EntityRef::Container(c));
        });
        if let Err(miss) = updated {
            warn!("Could not update test container {}: {}", uuid, miss);
        }
    }

    pub fn stop_test_container(&self, uuid: &str) {
        let now = now_unix_millis();
        let stopped = self.storage.with_container(uuid, |c| {
            self.notifier.before(Phase::Stop, EntityMut::Container(&mut *c));
            c.stop = Some(now);
            self.notifier.after(Phase::Stop, EntityRef::Container(c));
        });
        if let Err(miss) = stopped {
            warn!("Could not stop test container {}: {}", uuid, miss);
            return;
        }
        self.with_context(|ctx| ctx.remove_container(uuid));
        debug!("Stopped test container {}", uuid);
    }

    pub fn write_test_container(&self, uuid: &str) {
        let mut container = match self.storage.take_container(uuid) {
            Ok(container) => container,
            Err(miss) => {
                warn!("Could not write test container {}: {}", uuid, miss);
                return;
            }
        };
        self.notifier
            .before(Phase::Write, EntityMut::Container(&mut container));
        if let Err(e) = self.writer.write_container(&container) {
            error!("Could not write test container {}: {}", uuid, e);
        }
        self.notifier.after(Phase::Write, EntityRef::Container(&container));
        debug!("Wrote test container {}", uuid);
    }

    // ── Fixtures ───────────────────────────────────────────────────────

    /// Start a setup fixture of a container
    pub fn start_prepare_fixture(&self, container_uuid: &str, uuid: &str, fixture: FixtureResult) {
        self.start_fixture(container_uuid, uuid, FixtureKind::Prepare, fixture);
    }

    /// Start a teardown fixture of a container
    pub fn start_tear_down_fixture(
        &self,
        container_uuid: &str,
        uuid: &str,
        fixture: FixtureResult,
    ) {
        self.start_fixture(container_uuid, uuid, FixtureKind::TearDown, fixture);
    }

    /// Start a fixture and make it the current root on this thread
    pub fn start_fixture(
        &self,
        container_uuid: &str,
        uuid: &str,
        kind: FixtureKind,
        mut fixture: FixtureResult,
    ) {
        if self.storage.contains(uuid) {
            warn!("Could not start fixture: uuid {} is already registered", uuid);
            return;
        }
        self.notifier.before(Phase::Start, EntityMut::Fixture(&mut fixture));
        fixture.stage = Stage::Running;
        fixture.start.get_or_insert_with(now_unix_millis);

        let pushed = self.storage.apply(
            container_uuid,
            fixture.placeholder_of(uuid),
            move |entry, placeholder| {
                if let Item::Container(c) = &mut entry.item {
                    kind.fixtures_mut(c).push(placeholder);
                }
            },
        );
        let slot = match pushed {
            Ok(()) => Some(FixtureSlot {
                container: container_uuid.to_string(),
                kind,
            }),
            Err(_) => {
                warn!(
                    "Could not add fixture {} to container {}: container not found",
                    uuid, container_uuid
                );
                None
            }
        };

        if self
            .storage
            .insert(uuid, Item::Fixture { slot, result: fixture })
            .is_err()
        {
            warn!("Could not start fixture: uuid {} is already registered", uuid);
            return;
        }
        let _ = self.storage.with_fixture(uuid, |f| {
            self.notifier.after(Phase::Start, EntityRef::Fixture(f))
        });
        self.with_context(|ctx| ctx.start_root(Root::Fixture(uuid.to_string())));
        debug!("Started {:?} fixture {} in {}", kind, uuid, container_uuid);
    }

    pub fn update_fixture(&self, uuid: &str, update: impl FnOnce(&mut FixtureResult)) {
        let updated = self.storage.with_fixture(uuid, |f| {
            guard_stage("fixture", uuid, &mut *f, |f| {
                self.notifier.before(Phase::Update, EntityMut::Fixture(&mut *f));
                run_guarded("fixture", uuid, || update(&mut *f));
            });
            self.notifier.after(Phase::Update, EntityRef::Fixture(f));
        });
        if let Err(miss) = updated {
            warn!("Could not update test fixture {}: {}", uuid, miss);
        }
    }

    /// Update the fixture running on this thread
    pub fn update_current_fixture(&self, update: impl FnOnce(&mut FixtureResult)) {
        match self.current_fixture() {
            Some(uuid) => self.update_fixture(&uuid, update),
            None => warn!("Could not update test fixture: no test fixture running"),
        }
    }

    /// Finish a fixture and fold it into its container
    pub fn stop_fixture(&self, uuid: &str) {
        let (slot, mut fixture, pending) = match self.storage.take_fixture(uuid) {
            Ok(taken) => taken,
            Err(miss) => {
                warn!("Could not stop test fixture {}: {}", uuid, miss);
                return;
            }
        };
        self.resolve_pending(pending);

        self.notifier.before(Phase::Stop, EntityMut::Fixture(&mut fixture));
        finish(&mut fixture, now_unix_millis());
        self.notifier.after(Phase::Stop, EntityRef::Fixture(&fixture));

        if let Some(FixtureSlot { container, kind }) = slot {
            let fixture_uuid = uuid.to_string();
            let folded = self.storage.apply(&container, fixture, move |entry, fixture| {
                if let Item::Container(c) = &mut entry.item
                    && !fold(kind.fixtures_mut(c), fixture, |f| f.is_placeholder_of(&fixture_uuid))
                {
                    warn!(
                        "Placeholder of fixture {} was removed from {}, appending",
                        fixture_uuid, c.uuid
                    );
                }
            });
            if folded.is_err() {
                debug!("Fixture {} finished after container {} was written", uuid, container);
            }
        }
        self.with_context(|ctx| ctx.finish_root(uuid));
        debug!("Stopped fixture {}", uuid);
    }

    // ── Steps ──────────────────────────────────────────────────────────

    /// Start a step under a test case, fixture or step and push it on this thread
    pub fn start_step(&self, parent_uuid: &str, uuid: &str, mut step: StepResult) {
        if self.storage.contains(uuid) {
            warn!("Could not start step: uuid {} is already registered", uuid);
            return;
        }
        self.notifier.before(Phase::Start, EntityMut::Step(&mut step));
        step.stage = Stage::Running;
        step.start.get_or_insert_with(now_unix_millis);

        let pushed = self
            .storage
            .apply(parent_uuid, step.placeholder_of(uuid), |entry, placeholder| {
                match entry.item.as_executable_mut() {
                    Some(parent) => parent.steps_mut().push(placeholder),
                    None => warn!(
                        "Could not attach step {:?}: parent is a container",
                        placeholder.name
                    ),
                }
            });
        let parent = match pushed {
            Ok(()) => Some(parent_uuid.to_string()),
            Err(_) => {
                warn!(
                    "Could not attach step {} to {}: parent not found",
                    uuid, parent_uuid
                );
                None
            }
        };

        if self
            .storage
            .insert(uuid, Item::Step { parent, result: step })
            .is_err()
        {
            warn!("Could not start step: uuid {} is already registered", uuid);
            return;
        }
        let _ = self
            .storage
            .with_step(uuid, |s| self.notifier.after(Phase::Start, EntityRef::Step(s)));
        self.with_context(|ctx| ctx.push_step(uuid));
    }

    /// Start a step under whatever is current on this thread
    pub fn start_step_in_current(&self, uuid: &str, step: StepResult) {
        match self.current_test_case_or_step() {
            Some(parent) => self.start_step(&parent, uuid, step),
            None => warn!("Could not start step {}: no test case running", uuid),
        }
    }

    pub fn update_step(&self, uuid: &str, update: impl FnOnce(&mut StepResult)) {
        let updated = self.storage.with_step(uuid, |s| {
            guard_stage("step", uuid, &mut *s, |s| {
                self.notifier.before(Phase::Update, EntityMut::Step(&mut *s));
                run_guarded("step", uuid, || update(&mut *s));
            });
            self.notifier.after(Phase::Update, EntityRef::Step(s));
        });
        if let Err(miss) = updated {
            warn!("Could not update step {}: {}", uuid, miss);
        }
    }

    /// Update the innermost step open on this thread
    pub fn update_current_step(&self, update: impl FnOnce(&mut StepResult)) {
        match self.current_step() {
            Some(uuid) => self.update_step(&uuid, update),
            None => warn!("Could not update step: no step running"),
        }
    }

    /// Finish a step and fold it into its parent
    pub fn stop_step(&self, uuid: &str) {
        let (parent, mut step, pending) = match self.storage.take_step(uuid) {
            Ok(taken) => taken,
            Err(miss) => {
                if miss == Miss::NotFound {
                    self.with_context(|ctx| ctx.remove_step(uuid));
                }
                warn!("Could not stop step {}: {}", uuid, miss);
                return;
            }
        };
        self.resolve_pending(pending);

        self.notifier.before(Phase::Stop, EntityMut::Step(&mut step));
        finish(&mut step, now_unix_millis());
        if step.status.is_none() {
            step.status = self.config.lifecycle.default_step_status;
        }
        self.notifier.after(Phase::Stop, EntityRef::Step(&step));

        if let Some(parent) = parent {
            let step_uuid = uuid.to_string();
            let folded = self.storage.apply(&parent, step, move |entry, step| {
                if let Some(item) = entry.item.as_executable_mut()
                    && !fold(item.steps_mut(), step, |s| s.is_placeholder_of(&step_uuid))
                {
                    warn!("Placeholder of step {} was removed from its parent, appending", step_uuid);
                }
            });
            if folded.is_err() {
                debug!("Step {} finished after its parent {}", uuid, parent);
            }
        }

        if !self.with_context(|ctx| ctx.remove_step(uuid)) {
            debug!("Step {} was not the innermost step on this thread", uuid);
        }
    }

    /// Stop the innermost step open on this thread
    pub fn stop_current_step(&self) {
        match self.current_step() {
            Some(uuid) => self.stop_step(&uuid),
            None => warn!("Could not stop step: no step running"),
        }
    }

    // ── Thread context ─────────────────────────────────────────────────

    /// Test case running on this thread
    pub fn current_test_case(&self) -> Option<String> {
        self.read_context(ThreadContext::test_case)
    }

    /// Innermost step on this thread, or its test case or fixture
    pub fn current_test_case_or_step(&self) -> Option<String> {
        self.read_context(ThreadContext::current)
    }

    pub fn current_fixture(&self) -> Option<String> {
        self.read_context(ThreadContext::fixture)
    }

    pub fn current_step(&self) -> Option<String> {
        self.read_context(ThreadContext::step)
    }

    /// Innermost container started on this thread and not yet stopped
    pub fn current_container(&self) -> Option<String> {
        self.read_context(ThreadContext::container)
    }

    /// Copy of this thread's context
    pub fn context(&self) -> ThreadContext {
        context::snapshot(self.id)
    }

    /// Install a context on this thread until the guard is dropped
    pub fn attach_context(&self, context: ThreadContext) -> ContextGuard {
        ContextGuard::install(self.id, context)
    }

    pub fn clear_context(&self) {
        context::remove(self.id);
    }

    /// Wrap `f` so it runs with a copy of the caller's context on any thread
    pub fn propagate<F, R>(&self, f: F) -> impl FnOnce() -> R + Send + 'static
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let owner = self.id;
        let context = self.context();
        move || {
            let _guard = ContextGuard::install(owner, context);
            f()
        }
    }

    /// Spawn a thread that inherits a copy of the caller's context
    pub fn spawn<F, T>(&self, f: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        std::thread::spawn(self.propagate(f))
    }

    /// Status applied to steps that stop without one
    pub fn default_step_status(&self) -> Option<Status> {
        self.config.lifecycle.default_step_status
    }
}

impl Drop for AllureLifecycle {
    fn drop(&mut self) {
        context::remove(self.id);
    }
}
