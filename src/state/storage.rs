// Sharded storage of in-flight entities keyed by uuid
//
// Shard locks only guard the maps. Every entity sits behind its own mutex,
// which is taken after the shard lock is released, so callbacks never run with
// a shard locked. A thread never waits for an entity it is already inside:
// `apply` queues its work until the outer callback returns, everything else
// is refused with `Miss::Busy`.

use crate::model::{
    ExecutableItem, FixtureKind, FixtureResult, StepResult, TestResult, TestResultContainer,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::{DefaultHasher, Entry as MapEntry};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use std::thread::JoinHandle;
use thiserror::Error;

const SHARD_COUNT: usize = 32;

static NEXT_STORAGE_ID: AtomicU64 = AtomicU64::new(1);

type Deferred = Box<dyn FnOnce(&mut Entry)>;

/// An entity the current thread is running a callback on
struct Held {
    storage: u64,
    uuid: String,
    deferred: Vec<Deferred>,
}

thread_local! {
    static HELD: RefCell<Vec<Held>> = const { RefCell::new(Vec::new()) };
}

/// Why an entity could not be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Miss {
    #[error("not found")]
    NotFound,
    #[error("already being updated on this thread")]
    Busy,
}

/// Container and fixture list a fixture placeholder was pushed into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSlot {
    pub container: String,
    pub kind: FixtureKind,
}

#[derive(Debug)]
pub enum Item {
    TestCase(TestResult),
    Container(TestResultContainer),
    Fixture {
        slot: Option<FixtureSlot>,
        result: FixtureResult,
    },
    Step {
        parent: Option<String>,
        result: StepResult,
    },
}

impl Item {
    /// Test cases, fixtures and steps can own steps and attachments
    pub fn as_executable_mut(&mut self) -> Option<&mut dyn ExecutableItem> {
        match self {
            Item::TestCase(r) => Some(r as &mut dyn ExecutableItem),
            Item::Fixture { result, .. } => Some(result as &mut dyn ExecutableItem),
            Item::Step { result, .. } => Some(result as &mut dyn ExecutableItem),
            Item::Container(_) => None,
        }
    }
}

/// Attachment bytes still being produced on a worker thread
#[derive(Debug)]
pub struct PendingAttachment {
    pub source: String,
    pub handle: JoinHandle<Vec<u8>>,
}

#[derive(Debug)]
pub struct Entry {
    pub item: Item,
    pub pending: Vec<PendingAttachment>,
}

// `None` once the entity has been taken out
type Cell = Arc<Mutex<Option<Entry>>>;
type Shard = RwLock<HashMap<String, Cell>>;

/// Marks an entity as held by this thread until finished or dropped
struct HeldGuard {
    storage: u64,
    active: bool,
}

impl HeldGuard {
    fn enter(storage: u64, uuid: &str) -> Self {
        HELD.with(|held| {
            held.borrow_mut().push(Held {
                storage,
                uuid: uuid.to_string(),
                deferred: Vec::new(),
            })
        });
        Self {
            storage,
            active: true,
        }
    }

    /// Leave the entity and hand back the work queued on it meanwhile
    fn finish(mut self) -> Vec<Deferred> {
        self.active = false;
        pop_held(self.storage)
    }
}

impl Drop for HeldGuard {
    fn drop(&mut self) {
        if self.active {
            pop_held(self.storage);
        }
    }
}

// Holds nest, so the innermost entry for `storage` is the one being left
fn pop_held(storage: u64) -> Vec<Deferred> {
    HELD.try_with(|held| {
        let mut held = held.borrow_mut();
        match held.iter().rposition(|h| h.storage == storage) {
            Some(pos) => held.remove(pos).deferred,
            None => Vec::new(),
        }
    })
    .unwrap_or_default()
}

fn lock(cell: &Cell) -> MutexGuard<'_, Option<Entry>> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Storage {
    id: u64,
    shards: Box<[Shard]>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            id: NEXT_STORAGE_ID.fetch_add(1, Ordering::Relaxed),
            shards,
        }
    }

    fn shard(&self, uuid: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        uuid.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    // Shard locks are never held while user code runs; poisoning only follows
    // a bug in the storage itself, keep serving anyway.
    fn write(&self, uuid: &str) -> RwLockWriteGuard<'_, HashMap<String, Cell>> {
        self.shard(uuid)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cell(&self, uuid: &str) -> Option<Cell> {
        self.shard(uuid)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uuid)
            .cloned()
    }

    fn is_held(&self, uuid: &str) -> bool {
        HELD.with(|held| {
            held.borrow()
                .iter()
                .any(|h| h.storage == self.id && h.uuid == uuid)
        })
    }

    /// Insert a new entity; hands the item back if the uuid is already taken
    pub fn insert(&self, uuid: &str, item: Item) -> Result<(), Item> {
        match self.write(uuid).entry(uuid.to_string()) {
            MapEntry::Occupied(_) => Err(item),
            MapEntry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Some(Entry {
                    item,
                    pending: Vec::new(),
                }))));
                Ok(())
            }
        }
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.shard(uuid)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uuid)
    }

    pub fn count(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Run `f` on the entry with only the entry itself locked
    ///
    /// Calls made from inside `f` may reach any entity, including this one
    /// through `apply`.
    pub fn with_entry<R>(&self, uuid: &str, f: impl FnOnce(&mut Entry) -> R) -> Result<R, Miss> {
        let cell = self.cell(uuid).ok_or(Miss::NotFound)?;
        if self.is_held(uuid) {
            return Err(Miss::Busy);
        }
        let mut guard = lock(&cell);
        let entry = guard.as_mut().ok_or(Miss::NotFound)?;

        let held = HeldGuard::enter(self.id, uuid);
        let result = f(&mut *entry);
        for op in held.finish() {
            op(&mut *entry);
        }
        Ok(result)
    }

    /// Hand `value` to `op` on the entry
    ///
    /// When this thread is already inside the entry the work is queued and
    /// runs as soon as the outer callback returns. Gives `value` back when the
    /// entity is not stored.
    pub fn apply<T: 'static>(
        &self,
        uuid: &str,
        value: T,
        op: impl FnOnce(&mut Entry, T) + 'static,
    ) -> Result<(), T> {
        let mut work = Some((value, op));
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(h) = held
                .iter_mut()
                .rev()
                .find(|h| h.storage == self.id && h.uuid == uuid)
                && let Some((value, op)) = work.take()
            {
                h.deferred.push(Box::new(move |entry: &mut Entry| op(entry, value)));
            }
        });
        let Some((value, op)) = work else {
            return Ok(());
        };

        let Some(cell) = self.cell(uuid) else {
            return Err(value);
        };
        let mut guard = lock(&cell);
        match guard.as_mut() {
            Some(entry) => {
                op(entry, value);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// Take the entry out if `accept` approves its item
    pub fn remove_if(&self, uuid: &str, accept: impl FnOnce(&Item) -> bool) -> Result<Entry, Miss> {
        let cell = self.cell(uuid).ok_or(Miss::NotFound)?;
        if self.is_held(uuid) {
            return Err(Miss::Busy);
        }
        let entry = {
            let mut guard = lock(&cell);
            if !guard.as_ref().is_some_and(|e| accept(&e.item)) {
                return Err(Miss::NotFound);
            }
            guard.take()
        };

        let mut shard = self.write(uuid);
        if shard.get(uuid).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
            shard.remove(uuid);
        }
        entry.ok_or(Miss::NotFound)
    }

    pub fn with_test_case<R>(
        &self,
        uuid: &str,
        f: impl FnOnce(&mut TestResult) -> R,
    ) -> Result<R, Miss> {
        self.with_entry(uuid, |e| match &mut e.item {
            Item::TestCase(r) => Some(f(r)),
            _ => None,
        })?
        .ok_or(Miss::NotFound)
    }

    pub fn with_container<R>(
        &self,
        uuid: &str,
        f: impl FnOnce(&mut TestResultContainer) -> R,
    ) -> Result<R, Miss> {
        self.with_entry(uuid, |e| match &mut e.item {
            Item::Container(c) => Some(f(c)),
            _ => None,
        })?
        .ok_or(Miss::NotFound)
    }

    pub fn with_fixture<R>(
        &self,
        uuid: &str,
        f: impl FnOnce(&mut FixtureResult) -> R,
    ) -> Result<R, Miss> {
        self.with_entry(uuid, |e| match &mut e.item {
            Item::Fixture { result, .. } => Some(f(result)),
            _ => None,
        })?
        .ok_or(Miss::NotFound)
    }

    pub fn with_step<R>(&self, uuid: &str, f: impl FnOnce(&mut StepResult) -> R) -> Result<R, Miss> {
        self.with_entry(uuid, |e| match &mut e.item {
            Item::Step { result, .. } => Some(f(result)),
            _ => None,
        })?
        .ok_or(Miss::NotFound)
    }

    pub fn take_test_case(
        &self,
        uuid: &str,
    ) -> Result<(TestResult, Vec<PendingAttachment>), Miss> {
        let entry = self.remove_if(uuid, |i| matches!(i, Item::TestCase(_)))?;
        match entry.item {
            Item::TestCase(result) => Ok((result, entry.pending)),
            _ => Err(Miss::NotFound),
        }
    }

    pub fn take_container(&self, uuid: &str) -> Result<TestResultContainer, Miss> {
        let entry = self.remove_if(uuid, |i| matches!(i, Item::Container(_)))?;
        match entry.item {
            Item::Container(container) => Ok(container),
            _ => Err(Miss::NotFound),
        }
    }

    pub fn take_fixture(
        &self,
        uuid: &str,
    ) -> Result<(Option<FixtureSlot>, FixtureResult, Vec<PendingAttachment>), Miss> {
        let entry = self.remove_if(uuid, |i| matches!(i, Item::Fixture { .. }))?;
        match entry.item {
            Item::Fixture { slot, result } => Ok((slot, result, entry.pending)),
            _ => Err(Miss::NotFound),
        }
    }

    pub fn take_step(
        &self,
        uuid: &str,
    ) -> Result<(Option<String>, StepResult, Vec<PendingAttachment>), Miss> {
        let entry = self.remove_if(uuid, |i| matches!(i, Item::Step { .. }))?;
        match entry.item {
            Item::Step { parent, result } => Ok((parent, result, entry.pending)),
            _ => Err(Miss::NotFound),
        }
    }

    /// Take the attachments still being produced for an entity
    pub fn take_pending(&self, uuid: &str) -> Vec<PendingAttachment> {
        self.with_entry(uuid, |e| std::mem::take(&mut e.pending))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_insert_rejects_duplicate_uuid() {
        let storage = Storage::new();
        assert!(storage.insert("a", Item::TestCase(TestResult::new("a"))).is_ok());

        let second = storage.insert("a", Item::Container(TestResultContainer::new("a")));
        assert!(matches!(second, Err(Item::Container(_))));
        assert!(storage.with_test_case("a", |_| ()).is_ok());
        assert_eq!(storage.count(), 1);
    }

    #[test]
    fn test_typed_access_ignores_other_kinds() {
        let storage = Storage::new();
        storage
            .insert("c", Item::Container(TestResultContainer::new("c")))
            .unwrap();

        assert_eq!(storage.with_test_case("c", |_| ()), Err(Miss::NotFound));
        assert_eq!(storage.with_container("c", |c| c.uuid.clone()), Ok("c".to_string()));
    }

    #[test]
    fn test_remove_if_checks_kind() {
        let storage = Storage::new();
        storage
            .insert(
                "s",
                Item::Step {
                    parent: None,
                    result: StepResult::new("step"),
                },
            )
            .unwrap();

        assert!(storage
            .remove_if("s", |i| matches!(i, Item::TestCase(_)))
            .is_err());
        assert!(storage.contains("s"));
        let (parent, result, pending) = storage.take_step("s").expect("step present");
        assert!(parent.is_none());
        assert_eq!(result.name.as_deref(), Some("step"));
        assert!(pending.is_empty());
        assert_eq!(storage.count(), 0);
    }

    #[test]
    fn test_nested_access_to_same_entity_is_refused() {
        let storage = Storage::new();
        storage
            .insert("t", Item::TestCase(TestResult::new("t")))
            .unwrap();

        let inner = storage.with_test_case("t", |_| storage.with_test_case("t", |_| ()));
        assert_eq!(inner, Ok(Err(Miss::Busy)));
        assert!(storage.take_test_case("t").is_ok());
    }

    #[test]
    fn test_apply_inside_entity_runs_after_callback() {
        let storage = Storage::new();
        storage
            .insert("t", Item::TestCase(TestResult::new("t")))
            .unwrap();

        storage
            .with_test_case("t", |r| {
                let queued = storage.apply("t", StepResult::new("late"), |e, step| {
                    if let Some(item) = e.item.as_executable_mut() {
                        item.steps_mut().push(step);
                    }
                });
                assert!(queued.is_ok());
                assert!(r.steps.is_empty());
                r.steps.push(StepResult::new("first"));
            })
            .unwrap();

        let names = storage
            .with_test_case("t", |r| {
                r.steps.iter().filter_map(|s| s.name.clone()).collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(names, vec!["first".to_string(), "late".to_string()]);
    }

    #[test]
    fn test_apply_gives_value_back_when_missing() {
        let storage = Storage::new();
        let back = storage.apply("missing", 7u32, |_, _| {});
        assert_eq!(back, Err(7));
    }

    #[test]
    fn test_callback_does_not_block_other_entities_in_shard() {
        let storage = Arc::new(Storage::new());
        for i in 0..(SHARD_COUNT * 2) {
            let uuid = format!("t{}", i);
            storage.insert(&uuid, Item::TestCase(TestResult::new(&uuid))).unwrap();
        }

        let (tx, rx) = mpsc::channel();
        let worker = storage.clone();
        std::thread::spawn(move || {
            let reached = worker
                .with_test_case("t0", |_| {
                    (1..SHARD_COUNT * 2)
                        .all(|i| worker.with_test_case(&format!("t{}", i), |_| ()).is_ok())
                })
                .unwrap_or(false);
            let _ = tx.send(reached);
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
