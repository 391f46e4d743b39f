//! Rule definition schema with serde deserialization.
//!
//! Defines the complete type hierarchy for rule files:
//! - `Rule`: immutable rule definition (id, priority, flags, conditions, action)
//! - `Condition`: tagged union over the five condition variants
//! - `CombineLogic`: single-level AND/OR over a rule's conditions
//!
//! Field names are camelCase on the wire; the `type` field selects the
//! condition variant.

mod condition;
mod rule;

pub use condition::*;
pub use rule::*;
