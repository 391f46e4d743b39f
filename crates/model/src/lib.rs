//! Geospatial Markov transition model for vessel movement.
//!
//! This crate provides:
//! - Vessel-type-code → [`VesselClass`] classification
//! - Per-class transition tables keyed by (H3 cell, direction bin)
//! - Multi-step trajectory prediction
//! - Pairwise and single-point position anomaly scoring

mod error;
mod loader;
mod state_key;
mod transition;
mod vessel_class;

pub use error::{ModelError, Result};
pub use state_key::{direction_bin, StateKey, DIRECTION_BINS};
pub use transition::{
    cell_at, AnomalyReason, AnomalyVerdict, PredictedStep, TransitionModel, TransitionTable,
    ANOMALY_THRESHOLD, RESOLUTION,
};
pub use vessel_class::VesselClass;
