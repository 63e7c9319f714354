// ============================================================
// Layer 3 — Battery Metadata
// ============================================================
// Static, per-battery facts read from the metadata index.
// Every field except the identifier is optional on disk; the
// serde defaults below describe what "missing" means.
//
// Example metadata entry:
//   "B0005": {
//     "usable": true,
//     "path": "nasa/1",
//     "nominal_capacity": 2.0,
//     "fade_percent": 30.0,
//     "discharge": { "cutoff_voltage": 2.7, "type": "CC", "amplitude": 2.0 }
//   }

use serde::{Deserialize, Serialize};

/// Discharge waveform parameters used when the cycles were recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DischargeParams {
    #[serde(default)]
    pub cutoff_voltage: Option<f64>,

    /// Waveform type, e.g. "CC" or "square"
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub amplitude: Option<f64>,

    #[serde(default)]
    pub frequency: Option<f64>,

    #[serde(default)]
    pub duty_cycle: Option<f64>,
}

/// One battery's entry in the metadata index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryMetadata {
    /// Filled in from the index key when loading
    #[serde(default)]
    pub id: String,

    /// Batteries flagged unusable are skipped entirely
    #[serde(default = "default_usable")]
    pub usable: bool,

    /// Sub-path of the record store holding this battery's record
    #[serde(default, alias = "sub_path")]
    pub path: String,

    /// Rated capacity in amp-hours
    #[serde(default)]
    pub nominal_capacity: Option<f64>,

    #[serde(default, alias = "fade")]
    pub fade_percent: Option<f64>,

    #[serde(default)]
    pub discharge: DischargeParams,
}

fn default_usable() -> bool {
    true
}

impl BatteryMetadata {
    /// Metadata with only an identifier and rated capacity set.
    pub fn new(id: impl Into<String>, nominal_capacity: Option<f64>) -> Self {
        Self {
            id: id.into(),
            usable: true,
            path: String::new(),
            nominal_capacity,
            fade_percent: None,
            discharge: DischargeParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_fields_missing() {
        let meta: BatteryMetadata = serde_json::from_str("{}").unwrap();
        assert!(meta.usable);
        assert!(meta.nominal_capacity.is_none());
        assert_eq!(meta.discharge, DischargeParams::default());
    }

    #[test]
    fn test_discharge_type_renamed() {
        let meta: BatteryMetadata = serde_json::from_str(
            r#"{"usable": false, "sub_path": "a/b", "discharge": {"type": "square", "duty_cycle": 0.5}}"#,
        )
        .unwrap();
        assert!(!meta.usable);
        assert_eq!(meta.path, "a/b");
        assert_eq!(meta.discharge.kind.as_deref(), Some("square"));
        assert_eq!(meta.discharge.duty_cycle, Some(0.5));
    }
}
