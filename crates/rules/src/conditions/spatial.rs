//! Geometric tests on the event position.

use seawatch_core::{geo, VesselEvent};

use super::{ConditionError, Result};
use crate::schema::{SpatialCondition, SpatialOp};

impl SpatialCondition {
    pub(crate) fn evaluate(&self, event: &VesselEvent) -> Result<bool> {
        match self.op {
            SpatialOp::InPolygon => {
                if self.polygon.len() < 3 {
                    return Err(ConditionError::PolygonTooSmall(self.polygon.len()));
                }
                Ok(geo::point_in_polygon(event.location, &self.polygon))
            }
            SpatialOp::InCircle => {
                let center = self.circle_center.ok_or(ConditionError::MissingCircleCenter)?;
                Ok(geo::distance_meters(event.location, center) <= self.radius_meters)
            }
            SpatialOp::SideDistanceLt => Ok(self
                .other_entity
                .is_some_and(|other| geo::distance_meters(event.location, other) < self.distance_meters)),
        }
    }
}
