// ============================================================
// Layer 6 — Checkpoint Stores
// ============================================================
// Each training run owns exactly one "best" slot, identified by
// a structured key rather than a concatenated string:
//
//   CheckpointKey { loss, composition, architecture }
//
// Runs with different keys never touch each other's slot, so
// several runs can share one checkpoint directory.
//
// Two stores implement the same trait:
//
//   CheckpointManager      — files on disk, written with Burn's
//                            NamedMpkGzFileRecorder at full precision
//                            so a restored snapshot is bit-identical
//   MemoryCheckpointStore  — serialised bytes in a HashMap, for tests
//                            and dry runs
//
// File naming convention:
//   checkpoints/
//     best_mse_absolute_dense.mpk.gz
//     best_pinn_residual_dense.mpk.gz
//     ...
//     train_config.json      ← hyperparameters of the last run
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fmt, fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::loss::{CompositionKind, LossKind};
use crate::ml::model::Architecture;

/// Identity of one training run's best-checkpoint slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointKey {
    pub loss:         LossKind,
    pub composition:  CompositionKind,
    pub architecture: Architecture,
}

impl CheckpointKey {
    pub fn new(loss: LossKind, composition: CompositionKind, architecture: Architecture) -> Self {
        Self { loss, composition, architecture }
    }

    /// File name without extension — the recorder adds it.
    pub fn file_stem(&self) -> String {
        format!("best_{}_{}_{}", self.loss, self.composition, self.architecture)
    }
}

/// Model name used in logs and the summary table, e.g. `dense_pinn_residual`.
impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.architecture, self.loss, self.composition)
    }
}

/// Somewhere a run's best parameters can be saved and restored.
pub trait CheckpointStore {
    /// Overwrite the slot for `key` with the parameters of `model`.
    fn save<B: Backend, M: Module<B>>(&mut self, key: &CheckpointKey, model: &M) -> Result<()>;

    /// Load the slot for `key` into `model`, which must have the same
    /// architecture as the saved one.
    fn restore<B: Backend, M: Module<B>>(
        &self,
        key:    &CheckpointKey,
        model:  M,
        device: &B::Device,
    ) -> Result<M>;
}

// ─── CheckpointManager (files) ────────────────────────────────────────────────
pub struct CheckpointManager {
    /// Path to the directory where checkpoints are stored
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    fn recorder() -> NamedMpkGzFileRecorder<FullPrecisionSettings> {
        NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
    }

    /// Path of the slot for `key`, without extension.
    pub fn slot_path(&self, key: &CheckpointKey) -> PathBuf {
        self.dir.join(key.file_stem())
    }

    /// Save the training configuration to JSON so a run can be
    /// reproduced and its models rebuilt.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    #[cfg(test)]
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. Have you run 'train' first?",
                    path.display()
                )
            })?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl CheckpointStore for CheckpointManager {
    fn save<B: Backend, M: Module<B>>(&mut self, key: &CheckpointKey, model: &M) -> Result<()> {
        let path = self.slot_path(key);
        Self::recorder()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(())
    }

    fn restore<B: Backend, M: Module<B>>(
        &self,
        key:    &CheckpointKey,
        model:  M,
        device: &B::Device,
    ) -> Result<M> {
        let path   = self.slot_path(key);
        let record = Self::recorder()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        tracing::info!("Restored checkpoint '{}'", path.display());
        Ok(model.load_record(record))
    }
}

// ─── MemoryCheckpointStore ────────────────────────────────────────────────────
#[cfg(test)]
pub use memory::MemoryCheckpointStore;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;

    use anyhow::{Context, Result};
    use burn::{
        prelude::*,
        record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    };

    use super::{CheckpointKey, CheckpointStore};

    #[derive(Default)]
    pub struct MemoryCheckpointStore {
        slots: HashMap<CheckpointKey, Vec<u8>>,
        saves: usize,
    }

    impl MemoryCheckpointStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of save calls across all keys.
        pub fn save_count(&self) -> usize {
            self.saves
        }

        pub fn contains(&self, key: &CheckpointKey) -> bool {
            self.slots.contains_key(key)
        }
    }

    impl CheckpointStore for MemoryCheckpointStore {
        fn save<B: Backend, M: Module<B>>(&mut self, key: &CheckpointKey, model: &M) -> Result<()> {
            let bytes = BinBytesRecorder::<FullPrecisionSettings>::default()
                .record(model.clone().into_record(), ())
                .with_context(|| format!("Failed to serialise checkpoint '{key}'"))?;
            self.slots.insert(*key, bytes);
            self.saves += 1;
            Ok(())
        }

        fn restore<B: Backend, M: Module<B>>(
            &self,
            key:    &CheckpointKey,
            model:  M,
            device: &B::Device,
        ) -> Result<M> {
            let bytes = self
                .slots
                .get(key)
                .with_context(|| format!("No checkpoint stored for '{key}'"))?;
            let record = BinBytesRecorder::<FullPrecisionSettings>::default()
                .load(bytes.clone(), device)
                .with_context(|| format!("Failed to deserialise checkpoint '{key}'"))?;
            Ok(model.load_record(record))
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::ml::model::{DenseSocConfig, DenseSocModel, SocModel};

    fn key(loss: LossKind) -> CheckpointKey {
        CheckpointKey::new(loss, CompositionKind::Residual, Architecture::Dense)
    }

    fn outputs(model: &DenseSocModel<NdArray>) -> Vec<f32> {
        let x = Tensor::<NdArray, 3>::ones([1, 4, 4], &Default::default());
        model.forward(x).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_keys_do_not_collide() {
        let a = key(LossKind::Plain);
        let b = key(LossKind::PhysicsInformed);
        let c = CheckpointKey::new(LossKind::Plain, CompositionKind::Absolute, Architecture::Dense);
        assert_ne!(a.file_stem(), b.file_stem());
        assert_ne!(a.file_stem(), c.file_stem());
        assert_eq!(a.to_string(), "dense_mse_residual");
    }

    #[test]
    fn test_file_store_restores_exact_parameters() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut store = CheckpointManager::new(dir.path()).unwrap();

        let saved: DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);
        store.save(&key(LossKind::Plain), &saved).unwrap();

        let fresh: DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);
        let restored = store.restore(&key(LossKind::Plain), fresh, &device).unwrap();
        assert_eq!(outputs(&saved), outputs(&restored));

        let missing: DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);
        assert!(store.restore(&key(LossKind::PhysicsInformed), missing, &device).is_err());
    }

    #[test]
    fn test_memory_store_overwrites_slot() {
        let device = Default::default();
        let mut store = MemoryCheckpointStore::new();
        let first:  DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);
        let second: DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);

        store.save(&key(LossKind::Plain), &first).unwrap();
        store.save(&key(LossKind::Plain), &second).unwrap();
        assert_eq!(store.save_count(), 2);

        let fresh: DenseSocModel<NdArray> = DenseSocConfig::new().with_hidden(8).init(&device);
        let restored = store.restore(&key(LossKind::Plain), fresh, &device).unwrap();
        assert_eq!(outputs(&second), outputs(&restored));
    }
}
