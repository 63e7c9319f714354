// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Raw experimental records → fixed-length row store:
//
//   Step 1: Load the metadata index       (Layer 4 - data)
//   Step 2: For each usable battery, in identifier order:
//             load its raw record          (Layer 4 - data)
//             normalise it                 (Layer 3 - domain)
//             extract discharge cycles     (Layer 4 - data)
//             resample to L + derive SOC   (Layer 4 - data)
//   Step 3: Write the row store            (Layer 6 - infra)
//
// A battery whose record cannot be read is skipped with a
// warning. Extraction stops once the global cycle cap is spent.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    extractor::CycleExtractor,
    loader::{JsonMetadataIndex, JsonRecordStore},
};
use crate::domain::{
    cycle::NormalizedCycle,
    record::normalize,
    traits::{MetadataSource, RecordSource},
};
use crate::infra::row_store::write_rows;

// ─── Preparation Configuration ───────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub metadata_path:          String,
    pub records_dir:            String,
    pub output_path:            String,
    pub seq_len:                usize,
    pub max_cycles:             usize,
    pub max_cycles_per_battery: Option<usize>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            metadata_path:          "data/metadata.json".to_string(),
            records_dir:            "data/records".to_string(),
            output_path:            "data/cycles.csv".to_string(),
            seq_len:                128,
            max_cycles:             1000,
            max_cycles_per_battery: None,
        }
    }
}

/// Counts reported at the end of a preparation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub batteries_used:    usize,
    pub batteries_skipped: usize,
    pub rows:              usize,
}

pub struct PrepareUseCase {
    config: PrepareConfig,
}

impl PrepareUseCase {
    pub fn new(config: PrepareConfig) -> Self {
        Self { config }
    }

    /// Run against the JSON files named in the config and write the
    /// row store.
    pub fn execute(&self) -> Result<PrepareReport> {
        let cfg      = &self.config;
        let metadata = JsonMetadataIndex::new(&cfg.metadata_path);
        let records  = JsonRecordStore::new(&cfg.records_dir);

        let (rows, mut report) = self.collect(&metadata, &records)?;
        if rows.is_empty() {
            bail!("No discharge cycles found under '{}'", cfg.records_dir);
        }
        write_rows(&cfg.output_path, &rows)?;
        report.rows = rows.len();

        tracing::info!(
            "Prepared {} rows from {} batteries ({} skipped)",
            report.rows, report.batteries_used, report.batteries_skipped,
        );
        Ok(report)
    }

    /// Build the fixed-length rows from any metadata and record source.
    pub fn collect<M: MetadataSource, R: RecordSource>(
        &self,
        metadata: &M,
        records:  &R,
    ) -> Result<(Vec<NormalizedCycle>, PrepareReport)> {
        let cfg       = &self.config;
        let extractor = CycleExtractor::new(cfg.seq_len, cfg.max_cycles_per_battery);
        let mut report = PrepareReport::default();
        let mut rows   = Vec::new();

        let mut batteries = metadata.load_all()?;
        batteries.sort_by(|a, b| a.id.cmp(&b.id));

        for battery in batteries {
            let budget = cfg.max_cycles.saturating_sub(rows.len());
            if budget == 0 {
                tracing::info!("Global cycle cap of {} reached", cfg.max_cycles);
                break;
            }
            if !battery.usable {
                tracing::debug!("Battery {} marked unusable, skipping", battery.id);
                report.batteries_skipped += 1;
                continue;
            }

            let raw = match records.load(&battery) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Skipping battery {}: {:#}", battery.id, e);
                    report.batteries_skipped += 1;
                    continue;
                }
            };

            let record = normalize(raw);
            let cycles = extractor.extract(&record, &battery, budget);
            rows.extend(cycles.iter().map(|c| extractor.normalize(c)));
            report.batteries_used += 1;
        }

        report.rows = rows.len();
        Ok((rows, report))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;

    use crate::data::assembler::DatasetAssembler;
    use crate::data::normalizer::{FeatureNormalizer, Stats};
    use crate::domain::battery::BatteryMetadata;
    use crate::domain::record::RawRecord;

    struct FixedMetadata(Vec<BatteryMetadata>);

    impl MetadataSource for FixedMetadata {
        fn load_all(&self) -> Result<Vec<BatteryMetadata>> {
            Ok(self.0.clone())
        }
    }

    struct FixedRecords(HashMap<String, serde_json::Value>);

    impl RecordSource for FixedRecords {
        fn load(&self, battery: &BatteryMetadata) -> Result<RawRecord> {
            self.0
                .get(&battery.id)
                .cloned()
                .map(RawRecord::from)
                .ok_or_else(|| anyhow!("no record for {}", battery.id))
        }
    }

    /// Ten 1 A samples at 360 s spacing: 3600 s of discharge in total.
    fn one_hour_cycle() -> serde_json::Value {
        let time: Vec<f64> = (1..=10).map(|i| 360.0 * i as f64).collect();
        serde_json::json!({
            "type": "discharge",
            "ambient_temperature": 24,
            "data": {
                "Voltage_measured": (0..10).map(|i| 4.2 - 0.1 * i as f64).collect::<Vec<_>>(),
                "Current_measured": vec![1.0; 10],
                "Temperature_measured": vec![25.0; 10],
                "Time": time,
            }
        })
    }

    fn config(max_cycles: usize) -> PrepareConfig {
        PrepareConfig { seq_len: 10, max_cycles, ..PrepareConfig::default() }
    }

    fn sources() -> (FixedMetadata, FixedRecords) {
        let mut unusable = BatteryMetadata::new("B0003", Some(2.0));
        unusable.usable = false;
        let metadata = FixedMetadata(vec![
            BatteryMetadata::new("B0007", Some(2.0)),
            BatteryMetadata::new("B0005", Some(2.0)),
            BatteryMetadata::new("B0009", Some(2.0)),
            unusable,
        ]);
        let records = FixedRecords(HashMap::from([
            ("B0005".to_string(), serde_json::json!({ "cycle": [one_hour_cycle(), one_hour_cycle()] })),
            ("B0007".to_string(), serde_json::json!({ "cycle": [one_hour_cycle()] })),
            ("B0003".to_string(), serde_json::json!({ "cycle": [one_hour_cycle()] })),
        ]));
        (metadata, records)
    }

    #[test]
    fn test_skips_unusable_and_missing_batteries() {
        let (metadata, records) = sources();
        let (rows, report) = PrepareUseCase::new(config(100)).collect(&metadata, &records).unwrap();

        let ids: Vec<&str> = rows.iter().map(|r| r.battery.id.as_str()).collect();
        assert_eq!(ids, ["B0005", "B0005", "B0007"]);
        assert_eq!(report, PrepareReport { batteries_used: 2, batteries_skipped: 2, rows: 3 });
    }

    #[test]
    fn test_global_cap_follows_identifier_order() {
        let (metadata, records) = sources();
        let (rows, _) = PrepareUseCase::new(config(2)).collect(&metadata, &records).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.battery.id == "B0005"));
    }

    #[test]
    fn test_one_amp_hour_drawn_from_two() {
        let (metadata, records) = sources();
        let (rows, _) = PrepareUseCase::new(config(1)).collect(&metadata, &records).unwrap();

        let normalizer = FeatureNormalizer::new(Stats::compute(&rows).unwrap());
        let example = DatasetAssembler::new(normalizer, 10, None).assemble_one(&rows[0]);

        assert!(example.baseline[0] < 1.0);
        assert!(example.baseline.windows(2).all(|w| w[1] < w[0]));
        assert!((example.baseline[9] - 0.5).abs() < 1e-6);
        assert_eq!(example.target[0], 1.0);
        assert_eq!(example.target[9], 0.0);
    }

    #[test]
    fn test_execute_writes_row_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("metadata.json"),
            r#"{"B0005": {"nominal_capacity": 2.0, "path": "set1"}}"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("records/set1")).unwrap();
        std::fs::write(
            dir.path().join("records/set1/B0005.json"),
            serde_json::json!({ "B0005": { "cycle": [one_hour_cycle()] } }).to_string(),
        )
        .unwrap();

        let cfg = PrepareConfig {
            metadata_path: dir.path().join("metadata.json").display().to_string(),
            records_dir:   dir.path().join("records").display().to_string(),
            output_path:   dir.path().join("out/cycles.csv").display().to_string(),
            ..config(10)
        };
        let report = PrepareUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(report.rows, 1);

        let rows = crate::infra::row_store::read_rows(&cfg.output_path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 10);
        assert_eq!(rows[0].battery.path, "set1");
    }
}
