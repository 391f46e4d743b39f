//! [`TransitionModel`]: per-class (cell, direction) → next-cell probability tables.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use h3o::{CellIndex, LatLng, Resolution};
use indexmap::IndexMap;
use serde::Serialize;

use seawatch_core::GeoPoint;

use crate::error::{ModelError, Result};
use crate::state_key::{direction_bin, StateKey};
use crate::vessel_class::VesselClass;

/// Spatial resolution shared by every class table.
pub const RESOLUTION: Resolution = Resolution::Ten;

/// Probabilities below this are considered anomalous.
pub const ANOMALY_THRESHOLD: f64 = 0.1;

/// Outcome distributions for one vessel class.
///
/// Outcome maps keep source order; prediction tie-breaking depends on it.
pub type TransitionTable = HashMap<StateKey, IndexMap<u64, f64>>;

/// The H3 cell containing `point` at [`RESOLUTION`].
pub fn cell_at(point: GeoPoint) -> Result<CellIndex> {
    if !point.is_valid() {
        return Err(ModelError::InvalidCoordinate {
            lat: point.lat,
            lon: point.lon,
        });
    }
    LatLng::new(point.lat, point.lon)
        .map(|ll| ll.to_cell(RESOLUTION))
        .map_err(|_| ModelError::InvalidCoordinate {
            lat: point.lat,
            lon: point.lon,
        })
}

fn cell_center(cell: u64) -> Option<GeoPoint> {
    let index = CellIndex::try_from(cell).ok()?;
    let center = LatLng::from(index);
    Some(GeoPoint::new(center.lat(), center.lng()))
}

// ── Results ─────────────────────────────────────────────────────────

/// One step of a predicted trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedStep {
    /// H3 cell id of the predicted next position.
    pub cell: u64,
    /// Center of `cell`.
    pub lat: f64,
    pub lon: f64,
    pub probability: f64,
}

/// Why a verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    /// Both points fall in the same cell (stationary or micro-movement).
    SameCell,
    /// The (cell, direction) state never occurs in the history.
    StateNeverObserved,
    /// The state is known but the destination cell never followed it.
    TransitionNeverObserved,
    LowProbability,
    Normal,
    /// Mean outgoing probability of the state is below the threshold.
    RareState,
    CommonState,
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AnomalyReason::SameCell => "movement within the same cell",
            AnomalyReason::StateNeverObserved => "state never observed",
            AnomalyReason::TransitionNeverObserved => "transition never observed",
            AnomalyReason::LowProbability => "low-probability transition",
            AnomalyReason::Normal => "normal transition",
            AnomalyReason::RareState => "rare state",
            AnomalyReason::CommonState => "common state",
        };
        f.write_str(text)
    }
}

/// Outcome of an anomaly check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyVerdict {
    pub is_anomaly: bool,
    pub probability: f64,
    pub reason: AnomalyReason,
}

impl AnomalyVerdict {
    const fn new(is_anomaly: bool, probability: f64, reason: AnomalyReason) -> Self {
        Self {
            is_anomaly,
            probability,
            reason,
        }
    }
}

// ── Model ───────────────────────────────────────────────────────────

/// Immutable snapshot of all class tables.
///
/// Built once and shared read-only across rule workers.
#[derive(Debug, Clone, Default)]
pub struct TransitionModel {
    tables: HashMap<VesselClass, TransitionTable>,
}

impl TransitionModel {
    /// Empty model; populate with [`insert_table`](Self::insert_table).
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every class table from a model directory.
    ///
    /// A missing directory is fatal; unreadable files and malformed entries
    /// are skipped.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        crate::loader::load_dir(dir)
    }

    pub fn insert_table(&mut self, class: VesselClass, table: TransitionTable) {
        self.tables.insert(class, table);
    }

    /// Classes with a loaded table.
    pub fn classes(&self) -> Vec<VesselClass> {
        self.tables.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn table_for(&self, vessel_type: i32) -> Result<&TransitionTable> {
        let class = VesselClass::from_type_code(vessel_type);
        self.tables
            .get(&class)
            .ok_or(ModelError::ClassNotLoaded(class))
    }

    /// Predict up to `steps` next cells by repeatedly taking the most
    /// probable outcome.
    ///
    /// Stops early when a state is unknown or has no outcomes. Ties go to
    /// the outcome seen first in the source table.
    pub fn predict_path(
        &self,
        start: GeoPoint,
        course: f64,
        vessel_type: i32,
        steps: usize,
    ) -> Result<Vec<PredictedStep>> {
        let table = self.table_for(vessel_type)?;
        let bin = direction_bin(course);
        let mut current = start;
        let mut path = Vec::new();

        for _ in 0..steps {
            let cell = u64::from(cell_at(current)?);
            let Some(outcomes) = table.get(&StateKey::new(cell, bin)) else {
                break;
            };

            let mut best: Option<(u64, f64)> = None;
            for (&next, &prob) in outcomes {
                if best.map_or(true, |(_, p)| prob > p) {
                    best = Some((next, prob));
                }
            }
            let Some((next, probability)) = best else {
                break;
            };
            let Some(center) = cell_center(next) else {
                tracing::warn!(cell = next, "predicted cell is not a valid H3 index");
                break;
            };

            path.push(PredictedStep {
                cell: next,
                lat: center.lat,
                lon: center.lon,
                probability,
            });
            current = center;
        }

        Ok(path)
    }

    /// Score the movement `from` → `to` against the class history.
    pub fn check_transition(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        course: f64,
        vessel_type: i32,
    ) -> Result<AnomalyVerdict> {
        let from_cell = u64::from(cell_at(from)?);
        let to_cell = u64::from(cell_at(to)?);
        if from_cell == to_cell {
            return Ok(AnomalyVerdict::new(false, 1.0, AnomalyReason::SameCell));
        }

        let table = self.table_for(vessel_type)?;
        let Some(outcomes) = table.get(&StateKey::new(from_cell, direction_bin(course))) else {
            return Ok(AnomalyVerdict::new(true, 0.0, AnomalyReason::StateNeverObserved));
        };
        let Some(&prob) = outcomes.get(&to_cell) else {
            return Ok(AnomalyVerdict::new(
                true,
                0.0,
                AnomalyReason::TransitionNeverObserved,
            ));
        };

        if prob < ANOMALY_THRESHOLD {
            Ok(AnomalyVerdict::new(true, prob, AnomalyReason::LowProbability))
        } else {
            Ok(AnomalyVerdict::new(false, prob, AnomalyReason::Normal))
        }
    }

    /// Score a single position by how rare its state's outcomes are.
    ///
    /// Uses the arithmetic mean of all outgoing probabilities of the state,
    /// not the likelihood of any particular transition.
    pub fn check_position(
        &self,
        point: GeoPoint,
        course: f64,
        vessel_type: i32,
    ) -> Result<AnomalyVerdict> {
        let table = self.table_for(vessel_type)?;
        let cell = u64::from(cell_at(point)?);
        let Some(outcomes) = table.get(&StateKey::new(cell, direction_bin(course))) else {
            return Ok(AnomalyVerdict::new(true, 0.0, AnomalyReason::StateNeverObserved));
        };

        // An empty row has no typical outcome at all.
        let mean = if outcomes.is_empty() {
            0.0
        } else {
            outcomes.values().sum::<f64>() / outcomes.len() as f64
        };

        if mean < ANOMALY_THRESHOLD {
            Ok(AnomalyVerdict::new(true, mean, AnomalyReason::RareState))
        } else {
            Ok(AnomalyVerdict::new(false, mean, AnomalyReason::CommonState))
        }
    }
}
