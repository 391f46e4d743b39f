//! Error types for model loading and lookups.

use std::path::PathBuf;

use crate::vessel_class::VesselClass;

/// Errors raised by the transition model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model source directory does not exist.
    #[error("model directory not found: {0}")]
    MissingSource(PathBuf),

    /// Filesystem I/O error while scanning the model directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No table was loaded for the requested vessel class.
    #[error("no transition table loaded for vessel class '{0}'")]
    ClassNotLoaded(VesselClass),

    /// Coordinate outside the valid lat/lon range.
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
