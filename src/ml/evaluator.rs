// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a trained model, or the coulomb baseline on its own,
// against a held-out triple set. Every prediction and every
// target is concatenated before the metrics are computed:
//
//   RMSE = √( Σ(ŷ − y)² / n )
//   MAE  =    Σ|ŷ − y|  / n
//   R²   = 1 − Σ(ŷ − y)² / Σ(y − ȳ)²
//
// R² has no meaning when the targets are constant (Σ(y − ȳ)² = 0);
// that case is reported as `r2: None`, never as NaN or ±∞.

use anyhow::{anyhow, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use serde::Serialize;
use thiserror::Error;

use crate::data::{batcher::SocBatcher, dataset::SocDataset};
use crate::ml::loss::{CompositionKind, SocObjective};
use crate::ml::model::SocModel;

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("cannot evaluate an empty prediction set")]
    Empty,

    #[error("{predictions} predictions but {targets} targets")]
    LengthMismatch { predictions: usize, targets: usize },
}

/// Regression scores over one evaluation set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub rmse:  f64,
    pub mae:   f64,
    /// None when the targets have zero variance
    pub r2:    Option<f64>,
    pub count: usize,
}

impl RegressionMetrics {
    pub fn calculate(predictions: &[f32], targets: &[f32]) -> Result<Self, EvalError> {
        if predictions.len() != targets.len() {
            return Err(EvalError::LengthMismatch {
                predictions: predictions.len(),
                targets:     targets.len(),
            });
        }
        if targets.is_empty() {
            return Err(EvalError::Empty);
        }

        let n = targets.len() as f64;
        let mut sse = 0.0f64;
        let mut sae = 0.0f64;
        for (&p, &t) in predictions.iter().zip(targets) {
            let r = p as f64 - t as f64;
            sse += r * r;
            sae += r.abs();
        }

        let mean = targets.iter().map(|&t| t as f64).sum::<f64>() / n;
        let sst: f64 = targets.iter().map(|&t| (t as f64 - mean).powi(2)).sum();
        let r2 = (sst > 0.0).then(|| 1.0 - sse / sst);

        Ok(Self { rmse: (sse / n).sqrt(), mae: sae / n, r2, count: targets.len() })
    }
}

fn flatten_targets(dataset: &SocDataset) -> Vec<f32> {
    dataset
        .examples()
        .iter()
        .flat_map(|ex| ex.target.iter().copied())
        .collect()
}

/// Score a model's composed predictions against the targets.
pub fn evaluate_model<B: Backend, M: SocModel<B>>(
    model:       &M,
    composition: CompositionKind,
    dataset:     &SocDataset,
    batch_size:  usize,
    device:      &B::Device,
) -> Result<RegressionMetrics> {
    let batcher = SocBatcher::<B>::new(device.clone());
    let mut predictions = Vec::new();

    for chunk in dataset.examples().chunks(batch_size.max(1)) {
        let batch      = batcher.batch(chunk.to_vec());
        let prediction = composition.compose(model.forward(batch.features), batch.baseline);
        let values     = prediction
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;
        predictions.extend(values);
    }

    Ok(RegressionMetrics::calculate(&predictions, &flatten_targets(dataset))?)
}

/// Score the coulomb-counting baseline on its own.
pub fn evaluate_baseline(dataset: &SocDataset) -> Result<RegressionMetrics> {
    let baseline: Vec<f32> = dataset
        .examples()
        .iter()
        .flat_map(|ex| ex.baseline.iter().copied())
        .collect();
    Ok(RegressionMetrics::calculate(&baseline, &flatten_targets(dataset))?)
}

/// Mean per-batch objective loss, batched the way the training loop
/// batches its validation set.
pub fn validation_loss<B: Backend, M: SocModel<B>>(
    model:      &M,
    objective:  &SocObjective,
    dataset:    &SocDataset,
    batch_size: usize,
    device:     &B::Device,
) -> f64 {
    let batcher = SocBatcher::<B>::new(device.clone());
    let mut sum     = 0.0f64;
    let mut batches = 0usize;
    for chunk in dataset.examples().chunks(batch_size.max(1)) {
        let batch      = batcher.batch(chunk.to_vec());
        let prediction = objective.predict(model.forward(batch.features), batch.baseline.clone());
        sum += objective
            .loss(prediction, batch.target, batch.baseline)
            .into_scalar()
            .elem::<f64>();
        batches += 1;
    }
    sum / batches.max(1) as f64
}
