//! Per-vessel time tracking.
//!
//! Elapsed time is measured on event timestamps, not the wall clock.

use seawatch_core::VesselEvent;

use super::span;
use crate::schema::{TemporalOp, TemporalStateCondition};
use crate::state::RuleState;

impl TemporalStateCondition {
    pub(crate) fn evaluate(&self, event: &VesselEvent, state: &mut RuleState) -> bool {
        let now = event.timestamp;
        let duration = span(self.duration_seconds);

        match self.op {
            TemporalOp::ContinuousFor => {
                let start = *state
                    .temporal_start
                    .entry(event.vessel_id.clone())
                    .or_insert(now);
                now - start >= duration
            }
            // The first observation is never refreshed, so this measures time
            // since the vessel was first seen by this rule.
            TemporalOp::NoEventFor => match state.last_seen.get(&event.vessel_id) {
                Some(&first) => now - first >= duration,
                None => {
                    state.last_seen.insert(event.vessel_id.clone(), now);
                    false
                }
            },
        }
    }
}
