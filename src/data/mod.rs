// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From raw battery records to tensor batches:
//
//   metadata index + record store   (loader)
//       │
//       ▼
//   CanonicalRecord                 (domain::record::normalize)
//       │
//       ▼
//   CycleExtractor    → discharge cycles, resampled to L
//       │               (resampler)
//       ▼
//   Stats + FeatureNormalizer       (normalizer)
//       │
//       ▼
//   DatasetAssembler  → (features, baseline, target) triples
//       │               (baseline: coulomb counting)
//       ▼
//   split_train_val   → SocDataset ─► SocBatcher ─► DataLoader
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Metadata index and JSON record store
pub mod loader;

/// Linear resampling onto a fixed grid
pub mod resampler;

/// Coulomb-counting SOC baseline
pub mod baseline;

/// Discharge cycle extraction
pub mod extractor;

/// Corpus statistics and min-max feature scaling
pub mod normalizer;

/// Aligned training triples
pub mod assembler;

/// Burn Dataset over the triples
pub mod dataset;

/// Burn Batcher producing tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
