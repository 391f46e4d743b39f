//! Event intake and alert delivery around the rule engine.
//!
//! This crate provides:
//! - `AlertSink` trait for pluggable alert outputs
//! - Log and JSON-lines sink implementations
//! - Dispatcher that routes alerts to sinks by notify target
//! - `EventProcessor` feeding queued events through the engine

pub mod dispatcher;
pub mod processor;
pub mod sinks;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use processor::{EventProcessor, ProcessorStats};
pub use sinks::{JsonLinesSink, LogSink};
pub use traits::{AlertSink, DispatchError, DispatchResult};
