pub mod alert;
pub mod config;
pub mod error;
pub mod event;
pub mod geo;

pub use alert::Alert;
pub use config::Config;
pub use error::*;
pub use event::{GeoPoint, VesselEvent};
