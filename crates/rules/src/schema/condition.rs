//! Condition variants and their operator enums.

use std::path::PathBuf;

use seawatch_core::GeoPoint;
use serde::{Deserialize, Deserializer, Serialize};

/// One predicate of a rule, selected by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    #[serde(rename = "ValueCondition")]
    Value(ValueCondition),
    #[serde(rename = "SpatialCondition")]
    Spatial(SpatialCondition),
    #[serde(rename = "TemporalStateCondition")]
    Temporal(TemporalStateCondition),
    #[serde(rename = "AggregationCondition")]
    Aggregation(AggregationCondition),
    #[serde(rename = "PositionAnomalyCondition")]
    PositionAnomaly(PositionAnomalyCondition),
}

impl Condition {
    /// Wire name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Condition::Value(_) => "ValueCondition",
            Condition::Spatial(_) => "SpatialCondition",
            Condition::Temporal(_) => "TemporalStateCondition",
            Condition::Aggregation(_) => "AggregationCondition",
            Condition::PositionAnomaly(_) => "PositionAnomalyCondition",
        }
    }
}

// ── Value ───────────────────────────────────────────────────────────

/// Compare one event field against a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCondition {
    pub field: String,
    pub operator: CompareOp,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "contains")]
    Contains,
}

// ── Spatial ─────────────────────────────────────────────────────────

/// Geometric test on the event position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialCondition {
    pub op: SpatialOp,
    /// Ordered vertices for `in_polygon`.
    #[serde(default)]
    pub polygon: Vec<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_center: Option<GeoPoint>,
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
    /// Threshold for `side_distance_lt`.
    #[serde(default = "default_distance_meters")]
    pub distance_meters: f64,
    /// Reference position for `side_distance_lt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_entity: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialOp {
    InPolygon,
    InCircle,
    SideDistanceLt,
}

fn default_radius_meters() -> f64 {
    1000.0
}

fn default_distance_meters() -> f64 {
    100.0
}

// ── Durations ───────────────────────────────────────────────────────

/// Largest duration, in seconds, a condition may declare.
pub const MAX_DURATION_SECONDS: u64 = i64::MAX as u64 / 1000;

fn bounded_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    if secs > MAX_DURATION_SECONDS {
        return Err(serde::de::Error::custom(format!(
            "duration of {secs}s exceeds the maximum of {MAX_DURATION_SECONDS}s"
        )));
    }
    Ok(secs)
}

// ── Temporal ────────────────────────────────────────────────────────

/// Per-vessel time-based state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalStateCondition {
    pub op: TemporalOp,
    #[serde(deserialize_with = "bounded_seconds")]
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalOp {
    ContinuousFor,
    NoEventFor,
}

// ── Aggregation ─────────────────────────────────────────────────────

/// Sliding-window statistic over the rule's recent events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationCondition {
    pub op: AggregationOp,
    #[serde(deserialize_with = "bounded_seconds")]
    pub window_seconds: u64,
    /// Minimum count for `count_in_window`; distance in meters for `pair_exists`.
    pub threshold: f64,
    /// Only events passing this condition enter the window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Condition>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationOp {
    CountInWindow,
    PairExists,
}

// ── Position anomaly ────────────────────────────────────────────────

/// Flags positions the transition model considers unusual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAnomalyCondition {
    /// Model directory. `None` uses the context's default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_folder: Option<PathBuf>,
}
