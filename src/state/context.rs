// Per-thread "current" context
//
// Each recorder instance keeps its own context per thread. Contexts are plain
// values: propagating one to another thread copies it, so later changes on
// either side stay local.

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;

thread_local! {
    static CONTEXTS: RefCell<HashMap<u64, ThreadContext>> = RefCell::new(HashMap::new());
}

/// Entity at the bottom of the step stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    TestCase(String),
    Fixture(String),
}

impl Root {
    pub fn uuid(&self) -> &str {
        match self {
            Root::TestCase(uuid) | Root::Fixture(uuid) => uuid,
        }
    }
}

/// What is currently running on a thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadContext {
    root: Option<Root>,
    steps: Vec<String>,
    containers: Vec<String>,
}

impl ThreadContext {
    pub fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    pub fn test_case(&self) -> Option<&str> {
        match &self.root {
            Some(Root::TestCase(uuid)) => Some(uuid),
            _ => None,
        }
    }

    pub fn fixture(&self) -> Option<&str> {
        match &self.root {
            Some(Root::Fixture(uuid)) => Some(uuid),
            _ => None,
        }
    }

    /// Innermost open step
    pub fn step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// Innermost open step, or the root when no step is open
    pub fn current(&self) -> Option<&str> {
        self.step().or_else(|| self.root.as_ref().map(Root::uuid))
    }

    pub fn container(&self) -> Option<&str> {
        self.containers.last().map(String::as_str)
    }

    /// Open steps, outermost first
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.steps.is_empty() && self.containers.is_empty()
    }

    pub(crate) fn start_root(&mut self, root: Root) {
        self.root = Some(root);
        self.steps.clear();
    }

    pub(crate) fn clear_root(&mut self) {
        self.root = None;
        self.steps.clear();
    }

    /// Drop root and steps if `uuid` is the root
    pub(crate) fn finish_root(&mut self, uuid: &str) -> bool {
        if self.root.as_ref().is_some_and(|r| r.uuid() == uuid) {
            self.root = None;
            self.steps.clear();
            true
        } else {
            false
        }
    }

    pub(crate) fn push_step(&mut self, uuid: &str) {
        self.steps.push(uuid.to_string());
    }

    /// Remove a step; returns false when it was not on top of the stack
    pub(crate) fn remove_step(&mut self, uuid: &str) -> bool {
        match self.steps.iter().rposition(|s| s == uuid) {
            Some(pos) if pos + 1 == self.steps.len() => {
                self.steps.pop();
                true
            }
            Some(pos) => {
                self.steps.remove(pos);
                false
            }
            None => false,
        }
    }

    pub(crate) fn push_container(&mut self, uuid: &str) {
        self.containers.push(uuid.to_string());
    }

    pub(crate) fn remove_container(&mut self, uuid: &str) {
        if let Some(pos) = self.containers.iter().rposition(|c| c == uuid) {
            self.containers.remove(pos);
        }
    }
}

/// Run `f` on the calling thread's context for `owner`
///
/// A context left empty is dropped from the thread's map.
pub(crate) fn with_context<R>(owner: u64, f: impl FnOnce(&mut ThreadContext) -> R) -> R {
    CONTEXTS.with(|contexts| {
        let mut contexts = contexts.borrow_mut();
        let ctx = contexts.entry(owner).or_default();
        let result = f(ctx);
        if ctx.is_empty() {
            contexts.remove(&owner);
        }
        result
    })
}

/// Query the calling thread's context for `owner` without registering one
pub(crate) fn read<R>(owner: u64, f: impl FnOnce(&ThreadContext) -> R) -> R {
    CONTEXTS.with(|contexts| match contexts.borrow().get(&owner) {
        Some(ctx) => f(ctx),
        None => f(&ThreadContext::default()),
    })
}

/// Copy of the calling thread's context for `owner`
pub(crate) fn snapshot(owner: u64) -> ThreadContext {
    CONTEXTS.with(|contexts| contexts.borrow().get(&owner).cloned().unwrap_or_default())
}

/// Install `context`, returning what was there before
pub(crate) fn replace(owner: u64, context: ThreadContext) -> ThreadContext {
    CONTEXTS.with(|contexts| {
        contexts
            .borrow_mut()
            .insert(owner, context)
            .unwrap_or_default()
    })
}

pub(crate) fn remove(owner: u64) {
    // The thread may already be tearing down its locals.
    let _ = CONTEXTS.try_with(|contexts| contexts.borrow_mut().remove(&owner));
}

/// Restores the previous context of the thread when dropped
#[must_use = "the context is restored as soon as the guard is dropped"]
pub struct ContextGuard {
    owner: u64,
    previous: Option<ThreadContext>,
    // Contexts are per thread; the guard must be dropped where it was created.
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub(crate) fn install(owner: u64, context: ThreadContext) -> Self {
        let previous = replace(owner, context);
        Self {
            owner,
            previous: Some(previous),
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let owner = self.owner;
            let _ = CONTEXTS.try_with(|contexts| {
                let mut contexts = contexts.borrow_mut();
                if previous.is_empty() {
                    contexts.remove(&owner);
                } else {
                    contexts.insert(owner, previous);
                }
            });
        }
    }
}
