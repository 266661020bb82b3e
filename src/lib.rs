pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod report;
pub mod state;
pub mod time;
pub mod utils;

pub use error::{Error, Result};
pub use lifecycle::{AllureLifecycle, LifecycleBuilder, LifecycleListener, LifecycleSink};
pub use state::{ContextGuard, ThreadContext};
