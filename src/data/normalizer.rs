// ============================================================
// Layer 4 — Feature Normaliser
// ============================================================
// Per-channel min-max scaling with corpus-wide statistics:
//
//   x' = (x − min) / (max − min + ε)
//
// ε keeps the division finite when a channel is constant
// (min == max), in which case every value maps to 0.
//
// Stats are computed once, over every retained cycle (training
// and validation together), before any normalisation runs. The
// normaliser can only be built from a Stats value, which
// enforces that ordering.
//
// Output per cycle: L rows of
//   [voltage', current', temperature', time-index]
// where time-index is L evenly spaced values in [0, 1],
// independent of the real elapsed time.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::resampler::unit_ramp;
use crate::domain::cycle::NormalizedCycle;

/// Guards the min-max division against a zero range.
pub const EPSILON: f64 = 1e-8;

/// Width of one feature row: voltage, current, temperature, time-index.
pub const FEATURE_WIDTH: usize = 4;

/// Closed value range of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    fn empty() -> Self {
        Self { min: f64::INFINITY, max: f64::NEG_INFINITY }
    }

    fn include(&mut self, values: &[f64]) {
        for &v in values.iter().filter(|v| v.is_finite()) {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
    }

    /// Scale `x` into [0, 1) relative to this range.
    pub fn scale(&self, x: f64) -> f64 {
        (x - self.min) / (self.max - self.min + EPSILON)
    }
}

/// Corpus-wide per-channel ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub voltage: ChannelRange,
    pub current: ChannelRange,
    pub temperature: ChannelRange,
}

impl Stats {
    /// Compute channel ranges over every retained cycle.
    pub fn compute(cycles: &[NormalizedCycle]) -> Result<Self> {
        let mut stats = Stats {
            voltage: ChannelRange::empty(),
            current: ChannelRange::empty(),
            temperature: ChannelRange::empty(),
        };
        for cycle in cycles {
            stats.voltage.include(&cycle.voltage);
            stats.current.include(&cycle.current);
            stats.temperature.include(&cycle.temperature);
        }

        for (name, range) in [
            ("voltage", &stats.voltage),
            ("current", &stats.current),
            ("temperature", &stats.temperature),
        ] {
            if !range.min.is_finite() {
                bail!("Cannot compute {name} statistics: no finite samples in {} cycles", cycles.len());
            }
        }

        tracing::info!(
            "Stats: V=[{:.3}, {:.3}] I=[{:.3}, {:.3}] T=[{:.3}, {:.3}]",
            stats.voltage.min, stats.voltage.max,
            stats.current.min, stats.current.max,
            stats.temperature.min, stats.temperature.max,
        );
        Ok(stats)
    }
}

/// Builds fixed-width feature sequences from resampled channels.
#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    stats: Stats,
}

impl FeatureNormalizer {
    pub fn new(stats: Stats) -> Self {
        Self { stats }
    }

    /// Stack the normalised channels and the synthetic time index into
    /// an L × 4 sequence. L is the voltage length; shorter channels
    /// contribute 0 for their missing rows.
    pub fn features(
        &self,
        voltage: &[f64],
        current: &[f64],
        temperature: &[f64],
    ) -> Vec<[f32; FEATURE_WIDTH]> {
        let len = voltage.len();
        let ramp = unit_ramp(len);
        let at = |values: &[f64], range: &ChannelRange, i: usize| {
            values.get(i).map_or(0.0, |&x| range.scale(x)) as f32
        };
        (0..len)
            .map(|i| {
                [
                    at(voltage, &self.stats.voltage, i),
                    at(current, &self.stats.current, i),
                    at(temperature, &self.stats.temperature, i),
                    ramp[i] as f32,
                ]
            })
            .collect()
    }
}
