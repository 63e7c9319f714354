// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// CPU (ndarray) by default; `--features wgpu` trains on the GPU.
// Training runs on the autodiff wrapper; validation, evaluation
// and checkpoint restore use the inner backend through
// `model.valid()`.

use burn::backend::Autodiff;
use burn::tensor::backend::Backend;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

/// The autodiff backend used for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

pub fn default_device() -> <DefaultBackend as Backend>::Device {
    Default::default()
}

/// Human-readable backend name for logs
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "wgpu (GPU)"
    }
    #[cfg(not(feature = "wgpu"))]
    {
        "ndarray (CPU)"
    }
}
