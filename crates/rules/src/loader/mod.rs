//! Filesystem rule loader with hot-reload via `notify` watcher.
//!
//! Scans the rules directory for YAML/JSON rule files and feeds the engine's
//! hot-update entry points. Each file holds one rule or a list of rules.

mod core;
mod error;
mod watcher;


pub use self::core::RuleLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
pub use self::watcher::{reload, RuleWatcher, DEFAULT_DEBOUNCE};
