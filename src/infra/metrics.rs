// ============================================================
// Layer 6 — Metrics Logger and Summary Table
// ============================================================
// Two CSV artifacts per training invocation:
//
//   checkpoints/metrics.csv — one row per epoch of every run
//     model,epoch,train_loss,val_loss,best
//     dense_mse_absolute,1,0.084512,0.079310,1
//     dense_mse_absolute,2,0.041177,0.043020,1
//     ...
//
//   checkpoints/summary.csv — one row per evaluated model
//     model,rmse,mae,r2,count
//     coulomb_baseline,0.081200,0.064100,0.912300,2048
//     dense_pinn_residual,0.021700,0.015300,0.994200,2048
//
// The epoch log is appended to, so several runs (and several
// invocations) accumulate in one file. An R² that is undefined
// for the evaluation set is written as `n/a`.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use serde::Serialize;

use crate::infra::checkpoint::CheckpointKey;
use crate::ml::evaluator::RegressionMetrics;

const EPOCH_HEADER: [&str; 5] = ["model", "epoch", "train_loss", "val_loss", "best"];

/// Name under which the physics baseline appears in the summary.
pub const BASELINE_NAME: &str = "coulomb_baseline";

/// One row of the epoch log
#[derive(Debug, Clone, Serialize)]
pub struct EpochMetrics {
    /// Run name, e.g. `dense_pinn_residual`
    pub model: String,

    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean objective over the training batches
    pub train_loss: f64,

    /// Mean objective over the validation batches
    pub val_loss: f64,

    /// Whether this epoch overwrote the run's best snapshot
    pub best: bool,
}

impl EpochMetrics {
    pub fn new(key: &CheckpointKey, epoch: usize, train_loss: f64, val_loss: f64, best: bool) -> Self {
        Self { model: key.to_string(), epoch, train_loss, val_loss, best }
    }
}

/// Appends epoch rows to `<dir>/metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger, writing the header only if the file is new.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            w.write_record(EPOCH_HEADER)?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record([
            m.model.clone(),
            m.epoch.to_string(),
            format!("{:.6}", m.train_loss),
            format!("{:.6}", m.val_loss),
            if m.best { "1".into() } else { "0".into() },
        ])?;
        w.flush()?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── SummaryTable ─────────────────────────────────────────────────────────────
/// Model name → regression metrics, kept in name order.
#[derive(Debug, Default)]
pub struct SummaryTable {
    rows: BTreeMap<String, RegressionMetrics>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: impl Into<String>, metrics: RegressionMetrics) {
        self.rows.insert(model.into(), metrics);
    }

    pub fn get(&self, model: &str) -> Option<&RegressionMetrics> {
        self.rows.get(model)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Overwrite `path` with the whole table.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut w = csv::Writer::from_path(path)
            .with_context(|| format!("Cannot write summary to '{}'", path.display()))?;
        w.write_record(["model", "rmse", "mae", "r2", "count"])?;
        for (name, m) in &self.rows {
            w.write_record([
                name.clone(),
                format!("{:.6}", m.rmse),
                format!("{:.6}", m.mae),
                format_r2(m.r2),
                m.count.to_string(),
            ])?;
        }
        w.flush()?;
        tracing::info!("Wrote summary of {} models to '{}'", self.len(), path.display());
        Ok(())
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        println!("{:<24} {:>10} {:>10} {:>10}", "model", "rmse", "mae", "r2");
        for (name, m) in &self.rows {
            println!("{:<24} {:>10.6} {:>10.6} {:>10}", name, m.rmse, m.mae, format_r2(m.r2));
        }
    }
}

fn format_r2(r2: Option<f64>) -> String {
    r2.map_or_else(|| "n/a".to_string(), |v| format!("{v:.6}"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::loss::{CompositionKind, LossKind};
    use crate::ml::model::Architecture;

    #[test]
    fn test_epoch_log_appends_across_loggers() {
        let dir = tempfile::tempdir().unwrap();
        let key = CheckpointKey::new(LossKind::Plain, CompositionKind::Absolute, Architecture::Dense);

        MetricsLogger::new(dir.path()).unwrap()
            .log(&EpochMetrics::new(&key, 1, 0.5, 0.4, true)).unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(&key, 2, 0.3, 0.45, false)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "model,epoch,train_loss,val_loss,best");
        assert_eq!(lines[1], "dense_mse_absolute,1,0.500000,0.400000,1");
        assert_eq!(lines[2], "dense_mse_absolute,2,0.300000,0.450000,0");
    }

    #[test]
    fn test_summary_renders_missing_r2() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let mut table = SummaryTable::new();
        table.insert(BASELINE_NAME, RegressionMetrics { rmse: 0.1, mae: 0.05, r2: None, count: 10 });
        table.insert("dense_mse_absolute", RegressionMetrics { rmse: 0.02, mae: 0.01, r2: Some(0.9), count: 10 });
        table.write_csv(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], BASELINE_NAME);
        assert_eq!(&rows[0][3], "n/a");
        assert_eq!(&rows[1][3], "0.900000");
    }
}
