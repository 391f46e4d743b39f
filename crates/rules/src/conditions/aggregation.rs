//! Sliding-window aggregation over a rule's recent events.

use std::sync::Arc;

use seawatch_core::{geo, VesselEvent};

use super::{span, Result};
use crate::context::EvalContext;
use crate::schema::{AggregationCondition, AggregationOp, Condition};
use crate::state::RuleState;

impl AggregationCondition {
    pub(crate) fn evaluate(
        &self,
        event: &Arc<VesselEvent>,
        state: &mut RuleState,
        ctx: &EvalContext,
    ) -> Result<bool> {
        let now = event.timestamp;
        let window = span(self.window_seconds);

        let mut recent = std::mem::take(&mut state.recent_events);
        recent.retain(|past| now - past.timestamp <= window);

        if let Some(filter) = self.filter.as_deref() {
            recent = match refilter(filter, &recent, state, ctx) {
                Ok(kept) => kept,
                Err(e) => {
                    state.recent_events = recent;
                    return Err(e);
                }
            };
        }

        let admit = match self.filter.as_deref() {
            Some(filter) => filter.evaluate(event, state, ctx),
            None => Ok(true),
        };
        state.recent_events = recent;
        if admit? {
            state.recent_events.push(Arc::clone(event));
        }

        let matched = match self.op {
            AggregationOp::CountInWindow => state.recent_events.len() as f64 >= self.threshold,
            AggregationOp::PairExists => has_close_pair(&state.recent_events, self.threshold),
        };
        Ok(matched)
    }
}

/// Keep the historical events that still pass `filter`.
fn refilter(
    filter: &Condition,
    recent: &[Arc<VesselEvent>],
    state: &mut RuleState,
    ctx: &EvalContext,
) -> Result<Vec<Arc<VesselEvent>>> {
    let mut kept = Vec::with_capacity(recent.len() + 1);
    for past in recent {
        if filter.evaluate(past, state, ctx)? {
            kept.push(Arc::clone(past));
        }
    }
    Ok(kept)
}

/// Whether any two events lie closer than `threshold_m` meters.
fn has_close_pair(events: &[Arc<VesselEvent>], threshold_m: f64) -> bool {
    events.iter().enumerate().any(|(i, a)| {
        events[i + 1..]
            .iter()
            .any(|b| geo::distance_meters(a.location, b.location) < threshold_m)
    })
}
