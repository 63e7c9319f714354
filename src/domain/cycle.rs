// ============================================================
// Layer 3 — Discharge Cycle Types
// ============================================================
// Two views of the same discharge episode:
//
//   Cycle            — raw, variable-length channel arrays as
//                      extracted from a canonical record. Lives
//                      only while extraction runs.
//
//   NormalizedCycle  — every channel resampled to the fixed
//                      length L plus the derived SOC-from-time
//                      curve. This is what the row store persists
//                      and what training reloads.
//
// Both carry the battery's static metadata so a row is
// self-describing once written.

use serde::{Deserialize, Serialize};

use crate::domain::battery::BatteryMetadata;

/// Rated capacity assumed when neither the metadata nor the cycle
/// itself provides one (18650 cells in the reference corpus).
pub const DEFAULT_NOMINAL_CAPACITY_AH: f64 = 2.0;

/// Timestamp recorded when a cycle carries no usable date.
pub const UNKNOWN_TIMESTAMP: &str = "unknown";

/// A discharge cycle with its raw sensor traces.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub battery: BatteryMetadata,

    /// Lower-cased type tag, always "discharge" for extracted cycles
    pub kind: String,

    /// Position in the battery's cycle collection unless the record says otherwise
    pub index: usize,

    pub timestamp: String,

    /// None when the record has no ambient temperature
    pub ambient_temperature: Option<f64>,

    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub temperature: Vec<f64>,
    pub time: Vec<f64>,

    /// Measured capacity in Ah; None when absent or unparseable
    pub capacity: Option<f64>,
}

/// A cycle resampled onto the fixed grid of length L.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCycle {
    pub battery: BatteryMetadata,
    pub cycle_id: usize,
    pub timestamp: String,
    pub ambient_temperature: Option<f64>,
    pub capacity: Option<f64>,

    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub temperature: Vec<f64>,
    pub time: Vec<f64>,

    /// Ground-truth SOC derived from elapsed time, in [0, 1]
    pub soc: Vec<f64>,
}

impl NormalizedCycle {
    /// The fixed length every channel shares.
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    /// Capacity used by coulomb counting: rated, then measured, then the default.
    pub fn effective_capacity(&self) -> f64 {
        self.battery
            .nominal_capacity
            .filter(|c| c.is_finite() && *c > 0.0)
            .or(self.capacity.filter(|c| c.is_finite() && *c > 0.0))
            .unwrap_or(DEFAULT_NOMINAL_CAPACITY_AH)
    }

    /// Mean spacing of the time channel, if it spans a positive range.
    pub fn mean_time_step(&self) -> Option<f64> {
        mean_time_step(&self.time)
    }
}

/// Mean sample spacing of a time trace; None for fewer than two
/// samples or a non-increasing range.
pub fn mean_time_step(time: &[f64]) -> Option<f64> {
    if time.len() < 2 {
        return None;
    }
    let span = time[time.len() - 1] - time[0];
    let dt = span / (time.len() - 1) as f64;
    (dt.is_finite() && dt > 0.0).then_some(dt)
}
