//! Vessel detection rule engine.
//!
//! This crate provides:
//! - YAML/JSON rule definitions with serde deserialization
//! - Condition variants (value, spatial, temporal, aggregation, position anomaly)
//! - Per-rule evaluation state that survives rule content updates
//! - A concurrent engine with one worker per rule and hot rule updates
//! - Filesystem loader with hot-reload via `notify` watcher

pub mod conditions;
pub mod context;
pub mod engine;
pub mod loader;
pub mod schema;
pub mod state;

pub use conditions::ConditionError;
pub use context::EvalContext;
pub use engine::{resolve_exclusive, EngineError, EngineSettings, RuleDiff, RuleEngine};
pub use loader::{LoadResult, LoadStatus, RuleError, RuleLoader, RuleWatcher};
pub use schema::{CombineLogic, Condition, Rule, RuleAction};
pub use state::RuleState;
