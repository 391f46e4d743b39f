//! Transition-table state keys: (cell id, direction bin).

use std::fmt;

/// Number of equal course sectors.
pub const DIRECTION_BINS: u8 = 6;

const BIN_DEGREES: f64 = 360.0 / DIRECTION_BINS as f64;

/// Map a compass course to one of [`DIRECTION_BINS`] 60° sectors.
///
/// The course is normalized into `[0, 360)` first, so negative and
/// wrapped-around values land in the expected sector.
pub fn direction_bin(course: f64) -> u8 {
    if !course.is_finite() {
        return 0;
    }
    let normalized = ((course % 360.0) + 360.0) % 360.0;
    ((normalized / BIN_DEGREES) as u8).min(DIRECTION_BINS - 1)
}

/// Index of a transition-table row.
///
/// Serialized in model files as the literal string `"(<cell>, <bin>)"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub cell: u64,
    pub bin: u8,
}

impl StateKey {
    pub const fn new(cell: u64, bin: u8) -> Self {
        Self { cell, bin }
    }

    /// Parse the `"(<cell>, <bin>)"` form. Returns `None` when malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let inner = raw.trim().strip_prefix('(')?.strip_suffix(')')?;
        let (cell, bin) = inner.split_once(',')?;
        let cell = cell.trim().parse::<u64>().ok()?;
        let bin = bin.trim().parse::<u8>().ok()?;
        if bin >= DIRECTION_BINS {
            return None;
        }
        Some(Self { cell, bin })
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cell, self.bin)
    }
}
