// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Read the row store              (Layer 6 - infra)
//   Step 2: Corpus-wide channel statistics  (Layer 4 - data)
//   Step 3: Split train/validation          (Layer 4 - data)
//   Step 4: Assemble triples + datasets     (Layer 4 - data)
//   Step 5: Save config                     (Layer 6 - infra)
//   Step 6: One training run per (loss, composition) pair,
//           each evaluated after its best snapshot is
//           restored                        (Layer 5 - ml)
//   Step 7: Evaluate the coulomb baseline and write the
//           summary table                   (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use std::{
    fmt,
    path::Path,
    str::FromStr,
    sync::{atomic::AtomicBool, Arc},
};

use anyhow::{bail, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::data::{
    assembler::DatasetAssembler,
    dataset::SocDataset,
    normalizer::{FeatureNormalizer, Stats},
    splitter::split_train_val,
};
use crate::infra::{
    checkpoint::{CheckpointKey, CheckpointManager, CheckpointStore},
    metrics::{MetricsLogger, SummaryTable, BASELINE_NAME},
    row_store::read_rows,
};
use crate::ml::{
    backend::{backend_name, default_device, TrainingBackend},
    evaluator::{evaluate_baseline, evaluate_model, RegressionMetrics},
    loss::{CompositionKind, LossKind, PhysicsWeights, SocObjective},
    model::{Architecture, DenseSocConfig, LstmSocConfig, SocModel},
    trainer::{Trainer, TrainerConfig},
};

// ─── RunSpec ──────────────────────────────────────────────────────────────────
/// One (loss kind, composition kind) combination to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    pub loss:        LossKind,
    pub composition: CompositionKind,
}

impl RunSpec {
    /// Every combination, plain runs first.
    pub fn all() -> Vec<RunSpec> {
        [LossKind::Plain, LossKind::PhysicsInformed]
            .into_iter()
            .flat_map(|loss| {
                [CompositionKind::Absolute, CompositionKind::Residual]
                    .into_iter()
                    .map(move |composition| RunSpec { loss, composition })
            })
            .collect()
    }
}

impl fmt::Display for RunSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.loss, self.composition)
    }
}

/// Parses `mse:absolute`, `pinn:residual`, ...
impl FromStr for RunSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (loss, composition) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <loss>:<composition>, got '{s}'"))?;
        Ok(RunSpec { loss: loss.parse()?, composition: composition.parse()? })
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Saved next to the checkpoints so a run can be reproduced and
// its models rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub rows_path:      String,
    pub checkpoint_dir: String,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub alpha:          f64,
    pub beta:           f64,
    pub hidden:         usize,
    pub arch:           Architecture,
    pub runs:           Vec<RunSpec>,
    pub train_fraction: f64,
    pub seed:           u64,
    /// Fixed Δt in seconds; None uses each cycle's mean sample spacing
    pub time_step:      Option<f64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            rows_path:      "data/cycles.csv".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            batch_size:     16,
            epochs:         20,
            lr:             1e-3,
            alpha:          0.1,
            beta:           0.1,
            hidden:         64,
            arch:           Architecture::Dense,
            runs:           RunSpec::all(),
            train_fraction: 0.8,
            seed:           42,
            time_step:      None,
        }
    }
}

impl TrainConfig {
    fn weights(&self) -> PhysicsWeights {
        PhysicsWeights { alpha: self.alpha, beta: self.beta }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
    cancel: Arc<AtomicBool>,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config, cancel: Arc::new(AtomicBool::new(false)) }
    }

    /// Flag that stops the current run at its next epoch boundary and
    /// skips any remaining runs.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<SummaryTable> {
        let cfg = &self.config;
        if cfg.runs.is_empty() {
            bail!("No training runs selected");
        }

        // ── Steps 1–4: rows → datasets ────────────────────────────────────────
        let (train_dataset, val_dataset) = self.build_datasets()?;

        // ── Step 5: Save config ───────────────────────────────────────────────
        let mut store = CheckpointManager::new(&cfg.checkpoint_dir)?;
        store.save_config(cfg)?;
        let logger = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Steps 6–7: runs + summary ─────────────────────────────────────────
        tracing::info!("Training on backend {}", backend_name());
        let device  = default_device();
        let summary = self.run_all::<TrainingBackend, _>(
            &train_dataset, &val_dataset, &mut store, Some(&logger), &device,
        )?;

        summary.write_csv(Path::new(&cfg.checkpoint_dir).join("summary.csv"))?;
        summary.print();
        if let Some(baseline) = summary.get(BASELINE_NAME) {
            tracing::info!("Baseline to beat: rmse={:.6} mae={:.6}", baseline.rmse, baseline.mae);
        }
        Ok(summary)
    }

    fn build_datasets(&self) -> Result<(SocDataset, SocDataset)> {
        let cfg  = &self.config;
        let rows = read_rows(&cfg.rows_path)?;
        let Some(first) = rows.first() else {
            bail!("Row store '{}' is empty", cfg.rows_path);
        };
        let seq_len = first.len();

        // Stats span every row, i.e. training ∪ validation
        let normalizer = FeatureNormalizer::new(Stats::compute(&rows)?);
        let assembler  = DatasetAssembler::new(normalizer, seq_len, cfg.time_step);

        let (train_rows, val_rows) = split_train_val(rows, cfg.train_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train_rows.len(), val_rows.len());

        Ok((
            SocDataset::new(assembler.assemble(&train_rows)),
            SocDataset::new(assembler.assemble(&val_rows)),
        ))
    }

    /// Train every selected run, evaluate each restored model and the
    /// baseline on the validation set.
    pub fn run_all<B: AutodiffBackend, S: CheckpointStore>(
        &self,
        train:  &SocDataset,
        valid:  &SocDataset,
        store:  &mut S,
        logger: Option<&MetricsLogger>,
        device: &B::Device,
    ) -> Result<SummaryTable> {
        let cfg = &self.config;
        let mut summary = SummaryTable::new();

        for spec in &cfg.runs {
            if self.cancel.load(std::sync::atomic::Ordering::Relaxed) {
                tracing::warn!("Cancelled; skipping remaining runs");
                break;
            }
            let key = CheckpointKey::new(spec.loss, spec.composition, cfg.arch);
            let metrics = match cfg.arch {
                Architecture::Dense => {
                    let model = DenseSocConfig::new().with_hidden(cfg.hidden).init::<B>(device);
                    self.train_run(model, key, train, valid, store, logger, device)?
                }
                Architecture::Lstm => {
                    let model = LstmSocConfig::new().with_hidden(cfg.hidden).init::<B>(device);
                    self.train_run(model, key, train, valid, store, logger, device)?
                }
            };
            summary.insert(key.to_string(), metrics);
        }

        summary.insert(BASELINE_NAME, evaluate_baseline(valid)?);
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn train_run<B, M, S>(
        &self,
        model:  M,
        key:    CheckpointKey,
        train:  &SocDataset,
        valid:  &SocDataset,
        store:  &mut S,
        logger: Option<&MetricsLogger>,
        device: &B::Device,
    ) -> Result<RegressionMetrics>
    where
        B: AutodiffBackend,
        M: SocModel<B> + AutodiffModule<B>,
        M::InnerModule: SocModel<B::InnerBackend>,
        S: CheckpointStore,
    {
        let cfg = &self.config;
        let trainer_cfg = TrainerConfig {
            epochs:        cfg.epochs,
            batch_size:    cfg.batch_size,
            learning_rate: cfg.lr,
            seed:          cfg.seed,
            objective:     SocObjective::new(key.loss, key.composition, cfg.weights()),
        };

        let mut trainer = Trainer::new(trainer_cfg, key, store).with_cancel_flag(self.cancel_flag());
        if let Some(logger) = logger {
            trainer = trainer.with_logger(logger);
        }
        let outcome = trainer.fit::<B, M>(model, train.clone(), valid.clone(), device)?;

        let metrics = evaluate_model(
            &outcome.model.valid(),
            key.composition,
            valid,
            cfg.batch_size,
            device,
        )?;
        let improvements = outcome.history.iter().filter(|e| e.improved).count();
        if let Some(last) = outcome.history.last() {
            tracing::info!(
                "'{}': ran {} epochs{}, last train_loss={:.6} val_loss={:.6}, {} improvements",
                key, last.epoch,
                if outcome.cancelled { " (cancelled)" } else { "" },
                last.train_loss, last.val_loss, improvements,
            );
        }
        tracing::info!(
            "'{}': best epoch {} (val_loss={:.6}) | rmse={:.6} mae={:.6}",
            key, outcome.best_epoch, outcome.best_val_loss, metrics.rmse, metrics.mae,
        );
        Ok(metrics)
    }
}
