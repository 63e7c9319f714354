// ============================================================
// Layer 4 — Metadata and Record Loaders
// ============================================================
// File-backed implementations of the domain source traits.
//
//   JsonMetadataIndex  — one JSON object: { "<battery id>": {...}, ... }
//   JsonRecordStore    — one JSON record per battery at
//                        <root>/<sub_path>/<battery id>.json
//
// The index is returned sorted by identifier. That order is the
// battery-processing order, which makes the global cycle cap
// deterministic.

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::battery::BatteryMetadata;
use crate::domain::record::RawRecord;
use crate::domain::traits::{MetadataSource, RecordSource};

/// Reads the metadata index from a single JSON file.
pub struct JsonMetadataIndex {
    path: PathBuf,
}

impl JsonMetadataIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataSource for JsonMetadataIndex {
    fn load_all(&self) -> Result<Vec<BatteryMetadata>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read metadata index '{}'", self.path.display()))?;

        // BTreeMap keeps the identifiers sorted
        let index: BTreeMap<String, BatteryMetadata> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed metadata index '{}'", self.path.display()))?;

        let batteries: Vec<BatteryMetadata> = index
            .into_iter()
            .map(|(id, mut meta)| {
                meta.id = id;
                meta
            })
            .collect();

        tracing::info!("Loaded metadata for {} batteries", batteries.len());
        Ok(batteries)
    }
}

/// Reads raw per-battery records from a directory tree of JSON files.
pub struct JsonRecordStore {
    root: PathBuf,
}

impl JsonRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where the record for `battery` is expected.
    pub fn record_path(&self, battery: &BatteryMetadata) -> PathBuf {
        self.root
            .join(Path::new(&battery.path))
            .join(format!("{}.json", battery.id))
    }
}

impl RecordSource for JsonRecordStore {
    fn load(&self, battery: &BatteryMetadata) -> Result<RawRecord> {
        let path  = self.record_path(battery);
        let bytes = fs::read(&path)
            .with_context(|| format!("Cannot read record '{}'", path.display()))?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("Malformed record '{}'", path.display()))?;
        Ok(RawRecord::from(value))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_sorted_and_ids_filled() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, r#"{"B0018": {"nominal_capacity": 2.0}, "B0005": {"usable": false}}"#).unwrap();

        let batteries = JsonMetadataIndex::new(&path).load_all().unwrap();
        let ids: Vec<&str> = batteries.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["B0005", "B0018"]);
        assert!(!batteries[0].usable);
        assert_eq!(batteries[1].nominal_capacity, Some(2.0));
    }

    #[test]
    fn test_record_store_resolves_sub_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("set1")).unwrap();
        fs::write(dir.path().join("set1/B0005.json"), r#"{"cycle": []}"#).unwrap();

        let mut meta = BatteryMetadata::new("B0005", None);
        meta.path = "set1".into();
        let store = JsonRecordStore::new(dir.path());
        assert!(matches!(store.load(&meta).unwrap(), RawRecord::Map(_)));

        meta.id = "B0006".into();
        assert!(store.load(&meta).is_err());
    }
}
