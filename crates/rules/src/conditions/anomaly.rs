//! Position anomaly against the transition model.
//!
//! Fails open: a missing model or a failed lookup counts as "not anomalous".

use seawatch_core::VesselEvent;
use tracing::debug;

use crate::context::EvalContext;
use crate::schema::PositionAnomalyCondition;

const COURSE_KEYS: [&str; 4] = ["COG", "Cog", "course", "Course"];
const VESSEL_TYPE_KEYS: [&str; 3] = ["VesselType", "vtype", "VesselTypeCode"];

impl PositionAnomalyCondition {
    pub(crate) fn evaluate(&self, event: &VesselEvent, ctx: &EvalContext) -> bool {
        let Some(model) = ctx.model_for(self.model_folder.as_deref()) else {
            return false;
        };

        let course = first_number(event, &COURSE_KEYS).unwrap_or(0.0);
        let vessel_type = first_present(event, &VESSEL_TYPE_KEYS)
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .unwrap_or(0);

        match model.check_position(event.location, course, vessel_type) {
            Ok(verdict) => {
                debug!(
                    vessel = %event.vessel_id,
                    anomaly = verdict.is_anomaly,
                    probability = verdict.probability,
                    reason = %verdict.reason,
                    "position checked"
                );
                verdict.is_anomaly
            }
            Err(e) => {
                debug!(vessel = %event.vessel_id, error = %e, "anomaly check failed");
                false
            }
        }
    }
}

/// Text of the first present attribute among `keys`.
fn first_present(event: &VesselEvent, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| event.attribute_text(k))
}

/// Value of the first present attribute among `keys`, if it parses.
fn first_number(event: &VesselEvent, keys: &[&str]) -> Option<f64> {
    let key = keys.iter().find(|k| event.attribute_text(k).is_some())?;
    event.attribute_f64(key)
}
