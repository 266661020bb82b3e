// State module - in-flight reporting state
// Entity storage shared by all threads plus the per-thread "current" context

pub mod context;
pub mod storage;

pub use context::{ContextGuard, Root, ThreadContext};
pub use storage::Storage;
