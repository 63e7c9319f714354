// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Generic train + validation loop using Burn's DataLoader and Adam.
// One call to `Trainer::fit` is one run: a fixed (loss kind,
// composition kind, architecture) triple.
//
// Per epoch:
//   train batches   → predict → loss → backward → Adam step
//   valid set       → model.valid() → validation_loss (no updates)
//   TrainingState   → did val_loss beat the best so far?
//                     yes → overwrite the run's best slot
//
// After the last epoch (or a cancellation between epochs) the
// best slot is loaded back into the model, so the returned
// parameters are the best-validation ones, never simply the last.
//
// Key Burn insights:
//   - Training uses Autodiff<B> for gradients
//   - model.valid() returns the module on the inner backend
//   - validation therefore runs on B::InnerBackend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;
use thiserror::Error;

use crate::data::{batcher::SocBatcher, dataset::SocDataset};
use crate::infra::checkpoint::{CheckpointKey, CheckpointStore};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::evaluator::validation_loss;
use crate::ml::loss::SocObjective;
use crate::ml::model::SocModel;

/// Failures a caller may want to tell apart from plain I/O errors.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("non-finite {phase} loss ({value}) at epoch {epoch}; run aborted")]
    NonFiniteLoss { epoch: usize, phase: &'static str, value: f64 },

    #[error("{0} dataset is empty")]
    EmptyDataset(&'static str),

    #[error("no best checkpoint was recorded for '{0}'")]
    MissingCheckpoint(CheckpointKey),
}

/// Hyperparameters of one run.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    /// Shuffle seed of the training loader
    pub seed:          u64,
    pub objective:     SocObjective,
}

/// Mean losses of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochLoss {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    /// This epoch produced a new best snapshot
    pub improved:   bool,
}

/// Best-so-far bookkeeping threaded through the epoch loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingState {
    pub epoch:         usize,
    pub best_val_loss: f64,
    pub best_epoch:    Option<usize>,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self { epoch: 0, best_val_loss: f64::INFINITY, best_epoch: None }
    }
}

impl TrainingState {
    /// Record an epoch's validation loss. Returns true when it is a
    /// strict improvement, i.e. the caller must persist a snapshot.
    pub fn observe(&mut self, epoch: usize, val_loss: f64) -> bool {
        self.epoch = epoch;
        if val_loss < self.best_val_loss {
            self.best_val_loss = val_loss;
            self.best_epoch    = Some(epoch);
            true
        } else {
            false
        }
    }
}

/// Result of a run: the restored best model and its history.
#[derive(Debug)]
pub struct TrainOutcome<M> {
    pub model:         M,
    pub history:       Vec<EpochLoss>,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub cancelled:     bool,
}

pub struct Trainer<'a, S: CheckpointStore> {
    config: TrainerConfig,
    key:    CheckpointKey,
    store:  &'a mut S,
    logger: Option<&'a MetricsLogger>,
    cancel: Arc<AtomicBool>,
}

impl<'a, S: CheckpointStore> Trainer<'a, S> {
    pub fn new(config: TrainerConfig, key: CheckpointKey, store: &'a mut S) -> Self {
        Self {
            config,
            key,
            store,
            logger: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Append every epoch to a CSV metrics log.
    pub fn with_logger(mut self, logger: &'a MetricsLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Share a flag that stops training at the next epoch boundary.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn fit<B, M>(
        &mut self,
        mut model: M,
        train:     SocDataset,
        valid:     SocDataset,
        device:    &B::Device,
    ) -> Result<TrainOutcome<M>>
    where
        B: AutodiffBackend,
        M: SocModel<B> + AutodiffModule<B>,
        M::InnerModule: SocModel<B::InnerBackend>,
    {
        if model.architecture() != self.key.architecture {
            anyhow::bail!(
                "Model architecture '{}' does not match checkpoint key '{}'",
                model.architecture(), self.key,
            );
        }
        if train.sample_count() == 0 {
            return Err(TrainError::EmptyDataset("training").into());
        }
        if valid.sample_count() == 0 {
            return Err(TrainError::EmptyDataset("validation").into());
        }

        let cfg       = self.config.clone();
        let objective = cfg.objective;
        tracing::info!(
            "Run '{}': {} train / {} valid examples, {} epochs",
            self.key, train.sample_count(), valid.sample_count(), cfg.epochs,
        );

        // ── Adam optimiser ────────────────────────────────────────────────────
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

        // ── Data loaders ──────────────────────────────────────────────────────
        let train_loader = DataLoaderBuilder::new(SocBatcher::<B>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(1)
            .build(train);

        let mut state     = TrainingState::default();
        let mut history   = Vec::with_capacity(cfg.epochs);
        let mut cancelled = false;

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in 1..=cfg.epochs {
            let mut train_loss_sum = 0.0f64;
            let mut train_batches  = 0usize;

            for batch in train_loader.iter() {
                let output     = model.forward(batch.features);
                let prediction = objective.predict(output, batch.baseline.clone());
                let loss       = objective.loss(prediction, batch.target, batch.baseline);

                let value: f64 = loss.clone().into_scalar().elem::<f64>();
                if !value.is_finite() {
                    return Err(TrainError::NonFiniteLoss { epoch, phase: "training", value }.into());
                }
                train_loss_sum += value;
                train_batches  += 1;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(cfg.learning_rate, model, grads);
            }

            let train_loss = train_loss_sum / train_batches.max(1) as f64;
            let val_loss   = validation_loss::<B::InnerBackend, _>(
                &model.valid(),
                &objective,
                &valid,
                cfg.batch_size,
                device,
            );
            if !val_loss.is_finite() {
                return Err(TrainError::NonFiniteLoss { epoch, phase: "validation", value: val_loss }.into());
            }

            let improved = state.observe(epoch, val_loss);
            if improved {
                self.store.save::<B, M>(&self.key, &model)?;
                tracing::debug!("New best for '{}' at epoch {}", self.key, epoch);
            }

            println!(
                "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6}{}",
                epoch, cfg.epochs, train_loss, val_loss,
                if improved { " | best" } else { "" },
            );
            if let Some(logger) = self.logger {
                logger.log(&EpochMetrics::new(&self.key, epoch, train_loss, val_loss, improved))?;
            }
            history.push(EpochLoss { epoch, train_loss, val_loss, improved });

            if epoch < cfg.epochs && self.cancel.load(Ordering::Relaxed) {
                tracing::warn!("Run '{}' cancelled after epoch {}", self.key, state.epoch);
                cancelled = true;
                break;
            }
        }

        // ── Restore best snapshot ─────────────────────────────────────────────
        let best_epoch = state
            .best_epoch
            .ok_or(TrainError::MissingCheckpoint(self.key))?;
        let model = self.store.restore::<B, M>(&self.key, model, device)?;
        tracing::info!(
            "Run '{}' finished: best val_loss={:.6} at epoch {}",
            self.key, state.best_val_loss, best_epoch,
        );

        Ok(TrainOutcome {
            model,
            history,
            best_epoch,
            best_val_loss: state.best_val_loss,
            cancelled,
        })
    }
}
