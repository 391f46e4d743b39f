//! Condition evaluation.
//!
//! Each variant evaluates against one event, the owning rule's state, and the
//! shared [`EvalContext`]. Structurally invalid conditions surface as
//! [`ConditionError`]; the worker logs them and moves on to the next event.

mod aggregation;
mod anomaly;
mod spatial;
mod temporal;
mod value;

use std::sync::Arc;

use chrono::Duration;
use seawatch_core::VesselEvent;

use crate::context::EvalContext;
use crate::schema::Condition;
use crate::state::RuleState;

/// Errors from evaluating a malformed condition.
#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    PolygonTooSmall(usize),

    #[error("in_circle requires circleCenter")]
    MissingCircleCenter,
}

pub type Result<T> = std::result::Result<T, ConditionError>;

impl Condition {
    /// Evaluate this condition for one event.
    pub fn evaluate(
        &self,
        event: &Arc<VesselEvent>,
        state: &mut RuleState,
        ctx: &EvalContext,
    ) -> Result<bool> {
        match self {
            Condition::Value(c) => Ok(c.evaluate(event)),
            Condition::Spatial(c) => c.evaluate(event),
            Condition::Temporal(c) => Ok(c.evaluate(event, state)),
            Condition::Aggregation(c) => c.evaluate(event, state, ctx),
            Condition::PositionAnomaly(c) => Ok(c.evaluate(event, ctx)),
        }
    }
}

/// Seconds as a chrono duration, saturating at the largest representable span.
pub(crate) fn span(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
