// ============================================================
// Layer 4 — Dataset Assembler
// ============================================================
// Turns fixed-length cycles into aligned training triples:
//
//   NormalizedCycle ──► FeatureNormalizer ──► features  [L × 4]
//                   ──► CoulombCounter ─► resample ──► baseline  [L]
//                   ──► resample(soc) ────────────────► target    [L]
//
// The coulomb counter runs on the cycle's current trace at its
// own sample rate; the result is then resampled to L so the
// three sequences line up index for index.

use crate::data::baseline::CoulombCounter;
use crate::data::normalizer::{FeatureNormalizer, FEATURE_WIDTH};
use crate::data::resampler::resample;
use crate::domain::cycle::NormalizedCycle;

/// Time step used when a cycle has no usable time channel.
pub const DEFAULT_TIME_STEP: f64 = 1.0;

/// One aligned (features, baseline, target) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct SocExample {
    pub features: Vec<[f32; FEATURE_WIDTH]>,
    pub baseline: Vec<f32>,
    pub target: Vec<f32>,
}

impl SocExample {
    pub fn seq_len(&self) -> usize {
        self.target.len()
    }
}

pub struct DatasetAssembler {
    normalizer: FeatureNormalizer,
    seq_len: usize,
    /// Overrides the per-cycle mean sample spacing when set
    time_step: Option<f64>,
}

impl DatasetAssembler {
    pub fn new(normalizer: FeatureNormalizer, seq_len: usize, time_step: Option<f64>) -> Self {
        Self { normalizer, seq_len, time_step }
    }

    /// Build one triple per cycle, in input order.
    pub fn assemble(&self, cycles: &[NormalizedCycle]) -> Vec<SocExample> {
        let examples: Vec<SocExample> = cycles.iter().map(|c| self.assemble_one(c)).collect();
        tracing::debug!("Assembled {} examples (L={})", examples.len(), self.seq_len);
        examples
    }

    pub fn assemble_one(&self, cycle: &NormalizedCycle) -> SocExample {
        let len = self.seq_len;

        let voltage = resample(&cycle.voltage, len);
        let current = resample(&cycle.current, len);
        let temperature = resample(&cycle.temperature, len);
        let features = self.normalizer.features(&voltage, &current, &temperature);

        let dt = self
            .time_step
            .or_else(|| cycle.mean_time_step())
            .unwrap_or(DEFAULT_TIME_STEP);
        let counter = CoulombCounter::new(dt, cycle.effective_capacity());
        let baseline = resample(&counter.estimate(&cycle.current), len);

        let target = resample(&cycle.soc, len);

        SocExample {
            features,
            baseline: to_f32(&baseline),
            target: to_f32(&target),
        }
    }
}

fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}
