//! Vessel class derived from the AIS ship-type code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse vessel class; each class has its own transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VesselClass {
    Fishing,
    Pleasure,
    HighSpeed,
    Tug,
    Police,
    Passenger,
    Cargo,
    Tanker,
    Other,
}

impl VesselClass {
    /// Classify a numeric vessel-type code.
    pub fn from_type_code(code: i32) -> Self {
        match code {
            36..=39 => VesselClass::Pleasure,
            30..=35 => VesselClass::Fishing,
            55 | 56 => VesselClass::Police,
            50..=59 => VesselClass::Tug,
            60..=69 => VesselClass::Passenger,
            70..=79 => VesselClass::Cargo,
            80..=89 => VesselClass::Tanker,
            40..=49 => VesselClass::HighSpeed,
            _ => VesselClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VesselClass::Fishing => "fishing",
            VesselClass::Pleasure => "pleasure",
            VesselClass::HighSpeed => "highspeed",
            VesselClass::Tug => "tug",
            VesselClass::Police => "police",
            VesselClass::Passenger => "passenger",
            VesselClass::Cargo => "cargo",
            VesselClass::Tanker => "tanker",
            VesselClass::Other => "other",
        }
    }
}

impl fmt::Display for VesselClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VesselClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fishing" => Ok(VesselClass::Fishing),
            "pleasure" => Ok(VesselClass::Pleasure),
            "highspeed" => Ok(VesselClass::HighSpeed),
            "tug" => Ok(VesselClass::Tug),
            "police" => Ok(VesselClass::Police),
            "passenger" => Ok(VesselClass::Passenger),
            "cargo" => Ok(VesselClass::Cargo),
            "tanker" => Ok(VesselClass::Tanker),
            "other" => Ok(VesselClass::Other),
            other => Err(format!("unknown vessel class: '{}'", other)),
        }
    }
}
