//! Vessel position/state events as they enter the rule engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::CoreError;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the point lies within the valid latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A single vessel observation.
///
/// Immutable once built; every condition of every rule reads the same
/// instance (the engine shares it behind an `Arc`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselEvent {
    #[serde(default = "new_event_id")]
    pub id: String,
    pub vessel_id: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub course: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

impl VesselEvent {
    /// Build an event with a fresh id, stamped now, and no attributes.
    pub fn new(vessel_id: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: new_event_id(),
            vessel_id: vessel_id.into(),
            location,
            speed: 0.0,
            course: 0.0,
            timestamp: Utc::now(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Decode one JSON document (e.g. a line of a JSON-lines stream).
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let event: VesselEvent = serde_json::from_str(raw)?;
        if !event.location.is_valid() {
            return Err(CoreError::InvalidCoordinate {
                lat: event.location.lat,
                lon: event.location.lon,
            });
        }
        Ok(event)
    }

    /// Render an attribute as text. `null` counts as absent.
    pub fn attribute_text(&self, name: &str) -> Option<String> {
        self.attributes.get(name).and_then(value_text)
    }

    /// Parse an attribute as a number, accepting numeric strings.
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attribute_text(name)
            .and_then(|s| s.trim().parse::<f64>().ok())
    }

    /// Resolve a field by name: attributes first, then the built-in fields.
    ///
    /// Built-in names are matched case-insensitively.
    pub fn field_text(&self, name: &str) -> Option<String> {
        if let Some(v) = self.attribute_text(name) {
            return Some(v);
        }
        match name.to_ascii_lowercase().as_str() {
            "vesselid" | "vessel_id" | "mmsi" => Some(self.vessel_id.clone()),
            "speed" => Some(self.speed.to_string()),
            "course" => Some(self.course.to_string()),
            "lat" => Some(self.location.lat.to_string()),
            "lon" => Some(self.location.lon.to_string()),
            _ => None,
        }
    }
}

/// Render a scalar JSON value as comparison text.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_fills_defaults() {
        let ev = VesselEvent::from_json(
            r#"{"vesselId":"413000001","location":{"lat":22.15,"lon":114.15},"attributes":{"Speed":12.5}}"#,
        )
        .unwrap();
        assert_eq!(ev.vessel_id, "413000001");
        assert!(!ev.id.is_empty());
        assert_eq!(ev.attribute_f64("Speed"), Some(12.5));
    }

    #[test]
    fn decode_rejects_out_of_range_coordinates() {
        let err = VesselEvent::from_json(r#"{"vesselId":"x","location":{"lat":95.0,"lon":0.0}}"#);
        assert!(matches!(err, Err(CoreError::InvalidCoordinate { .. })));
    }

    #[test]
    fn field_text_falls_back_to_builtin_fields() {
        let mut ev = VesselEvent::new("V1", GeoPoint::new(1.0, 2.0));
        ev.speed = 14.0;
        assert_eq!(ev.field_text("speed").as_deref(), Some("14"));
        assert_eq!(ev.field_text("MMSI").as_deref(), Some("V1"));

        let ev = ev.with_attribute("speed", "fast");
        assert_eq!(ev.field_text("speed").as_deref(), Some("fast"));
        assert_eq!(ev.field_text("draught"), None);
    }

    #[test]
    fn null_attribute_counts_as_missing() {
        let ev = VesselEvent::new("V1", GeoPoint::new(0.0, 0.0))
            .with_attribute("AISStatus", Value::Null);
        assert_eq!(ev.attribute_text("AISStatus"), None);
    }
}
