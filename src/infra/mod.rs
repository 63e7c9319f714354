// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence the other layers lean on but do not own:
//
//   checkpoint.rs — best-snapshot slots keyed by
//                   (loss, composition, architecture), on disk
//                   or in memory; train_config.json
//
//   metrics.rs    — per-epoch CSV log and the final
//                   model → {RMSE, MAE, R²} summary table
//
//   row_store.rs  — wide-format CSV of fixed-length cycles,
//                   the hand-off from `prepare` to `train`
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger and summary table
pub mod metrics;

/// Intermediate row store
pub mod row_store;
