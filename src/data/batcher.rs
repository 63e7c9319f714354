// ============================================================
// Layer 4 — SOC Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<SocExample>
// into device tensors.
//
//   Input:  N examples, each L rows of 4 features
//   Output: features [N, L, 4], baseline [N, L], target [N, L]
//
// Every example already has the same length L, so batching is
// a flatten + reshape with no padding.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::assembler::SocExample;
use crate::data::normalizer::FEATURE_WIDTH;

// ─── SocBatch ─────────────────────────────────────────────────────────────────
/// A batch of aligned triples. All tensors have batch_size as their
/// first dimension.
#[derive(Debug, Clone)]
pub struct SocBatch<B: Backend> {
    /// Normalised features — shape: [batch_size, L, 4]
    pub features: Tensor<B, 3>,

    /// Coulomb-counting SOC — shape: [batch_size, L]
    pub baseline: Tensor<B, 2>,

    /// Ground-truth SOC — shape: [batch_size, L]
    pub target: Tensor<B, 2>,
}

// ─── SocBatcher ───────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SocBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SocBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SocExample, SocBatch<B>> for SocBatcher<B> {
    fn batch(&self, items: Vec<SocExample>) -> SocBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, SocExample::seq_len);

        let features_flat: Vec<f32> = items
            .iter()
            .flat_map(|ex| ex.features.iter().flat_map(|row| row.iter().copied()))
            .collect();
        let baseline_flat: Vec<f32> = items.iter().flat_map(|ex| ex.baseline.iter().copied()).collect();
        let target_flat:   Vec<f32> = items.iter().flat_map(|ex| ex.target.iter().copied()).collect();

        let features = Tensor::<B, 3>::from_data(
            TensorData::new(features_flat, [batch_size, seq_len, FEATURE_WIDTH]),
            &self.device,
        );
        let baseline = Tensor::<B, 2>::from_data(
            TensorData::new(baseline_flat, [batch_size, seq_len]),
            &self.device,
        );
        let target = Tensor::<B, 2>::from_data(
            TensorData::new(target_flat, [batch_size, seq_len]),
            &self.device,
        );

        SocBatch { features, baseline, target }
    }
}
