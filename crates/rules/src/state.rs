//! Per-rule evaluation memory.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use seawatch_core::VesselEvent;

/// Accumulated state for one rule id.
///
/// Survives content updates of the rule; dropped when the id leaves the
/// active set. Only the rule's own worker mutates it.
#[derive(Debug, Clone, Default)]
pub struct RuleState {
    pub rule_id: String,
    /// First time each vessel was seen by a `continuous_for` condition.
    pub temporal_start: HashMap<String, DateTime<Utc>>,
    /// Time each vessel was first recorded by a `no_event_for` condition.
    pub last_seen: HashMap<String, DateTime<Utc>>,
    /// Aggregation window, oldest first.
    pub recent_events: Vec<Arc<VesselEvent>>,
}

impl RuleState {
    pub fn new(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            ..Self::default()
        }
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.temporal_start.is_empty() && self.last_seen.is_empty() && self.recent_events.is_empty()
    }
}
