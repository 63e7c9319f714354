// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches tensors after batching lives here.
//
//   backend.rs   — backend aliases (NdArray by default, Wgpu
//                  behind the `wgpu` feature)
//
//   model.rs     — the SocModel capability and the two
//                  reference architectures (dense, LSTM)
//
//   loss.rs      — LossKind × CompositionKind, plain and
//                  physics-informed objectives
//
//   trainer.rs   — epoch loop with best-snapshot retention,
//                  non-finite guard and cancellation
//
//   evaluator.rs — RMSE / MAE / R² over a triple set
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Backend type aliases and device selection
pub mod backend;

/// SOC model capability and architectures
pub mod model;

/// Prediction composition and loss functions
pub mod loss;

/// Training loop with checkpoint policy
pub mod trainer;

/// Regression metrics for models and the baseline
pub mod evaluator;
