// ============================================================
// Layer 5 — Prediction Composition and Loss
// ============================================================
// Both choices are fixed once per run:
//
//   CompositionKind
//     Absolute  → prediction = model(features)
//     Residual  → prediction = baseline + model(features)
//
//   LossKind
//     Plain           → MSE(pred, target)
//     PhysicsInformed → MSE(pred, target)
//                       + α · MSE(pred, baseline)
//                       + β · mean( max(0, pred − 1) + max(0, −pred) )
//
// The α term ties predictions to the coulomb-counting physics;
// the β term penalises SOC outside [0, 1].
//
// Reference: Raissi, Perdikaris & Karniadakis (2019) Physics-informed
//            neural networks

use std::{fmt, str::FromStr};

use burn::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    Plain,
    PhysicsInformed,
}

impl LossKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LossKind::Plain           => "mse",
            LossKind::PhysicsInformed => "pinn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionKind {
    Absolute,
    Residual,
}

impl CompositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionKind::Absolute => "absolute",
            CompositionKind::Residual => "residual",
        }
    }

    /// Combine raw model output with the physics baseline.
    pub fn compose<B: Backend>(&self, output: Tensor<B, 2>, baseline: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            CompositionKind::Absolute => output,
            CompositionKind::Residual => baseline + output,
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CompositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mse" | "plain"                         => Ok(LossKind::Plain),
            "pinn" | "physics" | "physics_informed" => Ok(LossKind::PhysicsInformed),
            other => Err(format!("unknown loss kind '{other}' (expected mse or pinn)")),
        }
    }
}

impl FromStr for CompositionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" | "direct" => Ok(CompositionKind::Absolute),
            "residual"            => Ok(CompositionKind::Residual),
            other => Err(format!("unknown composition '{other}' (expected absolute or residual)")),
        }
    }
}

/// Weights of the physics-consistency (α) and boundary (β) terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsWeights {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for PhysicsWeights {
    fn default() -> Self {
        Self { alpha: 0.1, beta: 0.1 }
    }
}

/// The loss and composition chosen for one training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocObjective {
    pub loss: LossKind,
    pub composition: CompositionKind,
    pub weights: PhysicsWeights,
}

impl SocObjective {
    pub fn new(loss: LossKind, composition: CompositionKind, weights: PhysicsWeights) -> Self {
        Self { loss, composition, weights }
    }

    /// Model output → SOC prediction.
    pub fn predict<B: Backend>(&self, output: Tensor<B, 2>, baseline: Tensor<B, 2>) -> Tensor<B, 2> {
        self.composition.compose(output, baseline)
    }

    /// Scalar loss of `prediction` against the target (and, for the
    /// physics-informed kind, the baseline).
    pub fn loss<B: Backend>(
        &self,
        prediction: Tensor<B, 2>,
        target:     Tensor<B, 2>,
        baseline:   Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        match self.loss {
            LossKind::Plain => mse(prediction, target),
            LossKind::PhysicsInformed => {
                let data_fit    = mse(prediction.clone(), target);
                let consistency = mse(prediction.clone(), baseline);
                let boundary    = boundary_penalty(prediction);
                data_fit
                    + consistency.mul_scalar(self.weights.alpha)
                    + boundary.mul_scalar(self.weights.beta)
            }
        }
    }
}

/// Mean squared error over every element.
pub fn mse<B: Backend, const D: usize>(a: Tensor<B, D>, b: Tensor<B, D>) -> Tensor<B, 1> {
    (a - b).powf_scalar(2.0).mean()
}

/// mean( max(0, x − 1) + max(0, −x) ): zero iff every value is in [0, 1].
pub fn boundary_penalty<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, 1> {
    let above = (x.clone() - 1.0).clamp_min(0.0);
    let below = x.neg().clamp_min(0.0);
    (above + below).mean()
}
