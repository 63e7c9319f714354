// ============================================================
// Layer 4 — Cycle Extractor
// ============================================================
// Pulls discharge cycles out of one battery's canonical record
// and resamples them onto the fixed grid.
//
// Per entry of the battery's cycle collection:
//
//   1. read the type tag (case-insensitive); anything other than
//      "discharge", or no tag at all → skip
//   2. index (default: position), timestamp (default "unknown"),
//      ambient temperature (default: missing)
//   3. resolve voltage / current / temperature / time from the
//      nested data block through ordered candidate-key lists;
//      first match wins, no match → empty array
//   4. voltage or current shorter than MIN_CHANNEL_LEN → skip
//   5. capacity = first element of a possibly-nested field;
//      unparseable → kept, capacity marked missing
//
// Extraction stops quietly once the cycle budget is spent.
// Cycles already accepted are kept.

use chrono::NaiveDate;

use crate::data::resampler::{resample, unit_ramp};
use crate::domain::battery::BatteryMetadata;
use crate::domain::cycle::{Cycle, NormalizedCycle, UNKNOWN_TIMESTAMP};
use crate::domain::record::CanonicalRecord;

/// Shortest voltage/current trace a cycle may have.
pub const MIN_CHANNEL_LEN: usize = 5;

const DISCHARGE_TAG: &str = "discharge";

// ─── Candidate keys ───────────────────────────────────────────────────────────
// Resolved in order; the first key present in the data block wins.
const TYPE_KEYS: &[&str] = &["type", "Type", "cycle_type"];
const INDEX_KEYS: &[&str] = &["index", "cycle_index"];
const TIMESTAMP_KEYS: &[&str] = &["time", "timestamp", "date"];
const AMBIENT_KEYS: &[&str] = &["ambient_temperature", "ambient_temp", "ambient"];
const DATA_KEYS: &[&str] = &["data", "Data"];
const CYCLE_KEYS: &[&str] = &["cycle", "cycles"];

const VOLTAGE_KEYS: &[&str] = &["Voltage_measured", "voltage_measured", "Voltage", "voltage", "V"];
const CURRENT_KEYS: &[&str] = &["Current_measured", "current_measured", "Current", "current", "I"];
const TEMPERATURE_KEYS: &[&str] = &[
    "Temperature_measured",
    "temperature_measured",
    "Temperature",
    "temperature",
    "T",
];
const TIME_KEYS: &[&str] = &["Time", "time", "time_s", "elapsed", "t"];
const CAPACITY_KEYS: &[&str] = &["Capacity", "capacity"];

/// Extracts discharge cycles and builds fixed-length rows from them.
#[derive(Debug, Clone)]
pub struct CycleExtractor {
    /// Fixed length L of every resampled channel
    seq_len: usize,
    /// Optional cap on cycles taken from a single battery
    max_per_battery: Option<usize>,
}

impl CycleExtractor {
    pub fn new(seq_len: usize, max_per_battery: Option<usize>) -> Self {
        Self { seq_len, max_per_battery }
    }

    /// Extract up to `budget` discharge cycles from one battery's record.
    pub fn extract(
        &self,
        record: &CanonicalRecord,
        battery: &BatteryMetadata,
        budget: usize,
    ) -> Vec<Cycle> {
        let limit = self.max_per_battery.map_or(budget, |cap| cap.min(budget));
        let mut cycles = Vec::new();
        if limit == 0 {
            return cycles;
        }

        let entries = cycle_entries(record, &battery.id);
        if entries.is_empty() {
            tracing::debug!("Battery {}: no cycle collection found", battery.id);
        }

        for (position, entry) in entries.into_iter().enumerate() {
            if let Some(cycle) = extract_cycle(entry, position, battery) {
                tracing::trace!(
                    "Battery {}: {} cycle {} with {} samples",
                    battery.id, cycle.kind, cycle.index, cycle.voltage.len(),
                );
                cycles.push(cycle);
                if cycles.len() >= limit {
                    tracing::debug!("Battery {}: cycle cap of {} reached", battery.id, limit);
                    break;
                }
            }
        }

        tracing::debug!("Battery {}: {} discharge cycles kept", battery.id, cycles.len());
        cycles
    }

    /// Resample every channel of `cycle` to L points and derive the
    /// SOC-from-time target.
    pub fn normalize(&self, cycle: &Cycle) -> NormalizedCycle {
        let len = self.seq_len;
        let time = resample(&cycle.time, len);
        NormalizedCycle {
            battery: cycle.battery.clone(),
            cycle_id: cycle.index,
            timestamp: cycle.timestamp.clone(),
            ambient_temperature: cycle.ambient_temperature,
            capacity: cycle.capacity,
            voltage: resample(&cycle.voltage, len),
            current: resample(&cycle.current, len),
            temperature: resample(&cycle.temperature, len),
            soc: soc_from_time(&time, !cycle.time.is_empty()),
            time,
        }
    }
}

/// The battery's cycle entries. Looked up at the root, then under the
/// battery id, then under a lone top-level mapping. A single mapping
/// counts as a one-element collection.
fn cycle_entries<'a>(record: &'a CanonicalRecord, battery_id: &str) -> Vec<&'a CanonicalRecord> {
    let collection = record
        .get_first(CYCLE_KEYS)
        .or_else(|| record.get(battery_id).and_then(|b| b.get_first(CYCLE_KEYS)))
        .or_else(|| match record {
            CanonicalRecord::Mapping(map) if map.len() == 1 => {
                map.values().next().and_then(|b| b.get_first(CYCLE_KEYS))
            }
            _ => None,
        });

    match collection {
        Some(CanonicalRecord::Sequence(items)) => items.iter().collect(),
        Some(single) if matches!(single, CanonicalRecord::Mapping(_)) => vec![single],
        _ => Vec::new(),
    }
}

fn extract_cycle(entry: &CanonicalRecord, position: usize, battery: &BatteryMetadata) -> Option<Cycle> {
    let kind = entry.get_first(TYPE_KEYS)?.as_text()?.trim().to_lowercase();
    if kind != DISCHARGE_TAG {
        return None;
    }

    // Without a nested data block the entry itself holds the channels.
    let data = entry.get_first(DATA_KEYS).unwrap_or(entry);

    let voltage = channel(data, VOLTAGE_KEYS);
    let current = channel(data, CURRENT_KEYS);
    if voltage.len() < MIN_CHANNEL_LEN || current.len() < MIN_CHANNEL_LEN {
        tracing::trace!(
            "Battery {}: skipping cycle {} (voltage={}, current={} samples)",
            battery.id,
            position,
            voltage.len(),
            current.len()
        );
        return None;
    }

    let index = entry
        .get_first(INDEX_KEYS)
        .and_then(CanonicalRecord::first_number)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map_or(position, |n| n as usize);

    let capacity = data
        .get_first(CAPACITY_KEYS)
        .or_else(|| entry.get_first(CAPACITY_KEYS))
        .and_then(CanonicalRecord::first_number)
        .filter(|c| c.is_finite());

    // A timestamp key inside the data block would be the time channel.
    let timestamp = if std::ptr::eq(data, entry) {
        None
    } else {
        entry.get_first(TIMESTAMP_KEYS).and_then(render_timestamp)
    };

    Some(Cycle {
        battery: battery.clone(),
        kind,
        index,
        timestamp: timestamp.unwrap_or_else(|| UNKNOWN_TIMESTAMP.to_string()),
        ambient_temperature: entry
            .get_first(AMBIENT_KEYS)
            .and_then(CanonicalRecord::first_number),
        temperature: channel(data, TEMPERATURE_KEYS),
        time: channel(data, TIME_KEYS),
        voltage,
        current,
        capacity,
    })
}

fn channel(data: &CanonicalRecord, candidates: &[&str]) -> Vec<f64> {
    data.get_first(candidates)
        .and_then(CanonicalRecord::as_numbers)
        .unwrap_or_default()
}

/// Text is kept verbatim; a `[y, m, d, h, mi, s]` date vector is formatted.
fn render_timestamp(value: &CanonicalRecord) -> Option<String> {
    if let Some(text) = value.as_text() {
        return Some(text.to_string());
    }
    match value.as_numbers()?.as_slice() {
        [y, mo, d, h, mi, s] => NaiveDate::from_ymd_opt(*y as i32, *mo as u32, *d as u32)
            .and_then(|date| date.and_hms_opt(*h as u32, *mi as u32, s.floor() as u32))
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        _ => None,
    }
}

/// SOC target from elapsed time: 1 at the first sample, 0 at the last.
/// Falls back to an index ramp when the time channel is missing or flat.
fn soc_from_time(time: &[f64], has_time: bool) -> Vec<f64> {
    let span = match (time.first(), time.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };
    if has_time && span.is_finite() && span > 0.0 {
        let t0 = time[0];
        time.iter()
            .map(|t| (1.0 - (t - t0) / span).clamp(0.0, 1.0))
            .collect()
    } else {
        unit_ramp(time.len()).into_iter().map(|r| 1.0 - r).collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{normalize, RawRecord};

    fn battery() -> BatteryMetadata {
        BatteryMetadata::new("B0005", Some(2.0))
    }

    fn entry(kind: &str, n: usize) -> serde_json::Value {
        let samples: Vec<f64> = (0..n).map(|i| i as f64).collect();
        serde_json::json!({
            "type": kind,
            "ambient_temperature": 24,
            "time": [2008, 4, 2, 15, 25, 41.2],
            "data": {
                "Voltage_measured": samples,
                "Current_measured": samples,
                "Temperature_measured": samples,
                "Time": samples,
                "Capacity": [1.85]
            }
        })
    }

    fn record(entries: Vec<serde_json::Value>) -> CanonicalRecord {
        normalize(RawRecord::from(serde_json::json!({ "B0005": { "cycle": entries } })))
    }

    #[test]
    fn test_only_discharge_with_enough_samples_survives() {
        let rec = record(vec![
            entry("charge", 10),
            entry("Discharge", 10),
            entry("impedance", 10),
            entry("discharge", 3),
        ]);
        let cycles = CycleExtractor::new(16, None).extract(&rec, &battery(), 100);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].index, 1);
        assert_eq!(cycles[0].kind, "discharge");
        assert_eq!(cycles[0].capacity, Some(1.85));
        assert_eq!(cycles[0].ambient_temperature, Some(24.0));
        assert_eq!(cycles[0].timestamp, "2008-04-02 15:25:41");
    }

    #[test]
    fn test_budget_stops_extraction() {
        let rec = record((0..5).map(|_| entry("discharge", 8)).collect());
        let extractor = CycleExtractor::new(16, None);
        assert_eq!(extractor.extract(&rec, &battery(), 2).len(), 2);
        assert!(extractor.extract(&rec, &battery(), 0).is_empty());
        let capped = CycleExtractor::new(16, Some(3));
        assert_eq!(capped.extract(&rec, &battery(), 100).len(), 3);
    }

    #[test]
    fn test_single_entry_is_a_collection() {
        let rec = normalize(RawRecord::from(serde_json::json!({ "cycle": entry("discharge", 6) })));
        let cycles = CycleExtractor::new(8, None).extract(&rec, &battery(), 10);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].index, 0);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let rec = normalize(RawRecord::from(serde_json::json!({
            "cycle": [
                { "data": { "voltage": [1, 2, 3, 4, 5] } },
                { "type": "discharge", "data": {
                    "voltage": [4.2, 4.1, 4.0, 3.9, 3.8],
                    "current": [1, 1, 1, 1, 1],
                    "Capacity": "not a number"
                } }
            ]
        })));
        let cycles = CycleExtractor::new(8, None).extract(&rec, &battery(), 10);
        assert_eq!(cycles.len(), 1);
        let c = &cycles[0];
        assert_eq!(c.index, 1);
        assert!(c.capacity.is_none());
        assert!(c.ambient_temperature.is_none());
        assert!(c.temperature.is_empty());
        assert!(c.time.is_empty());
        assert_eq!(c.timestamp, UNKNOWN_TIMESTAMP);
    }

    #[test]
    fn test_row_matrix_channels_are_read() {
        let rec = normalize(RawRecord::from(serde_json::json!({
            "cycle": [{ "type": "discharge", "data": {
                "Voltage_measured": [[4.2, 4.1, 4.0, 3.9, 3.8, 3.7]],
                "Current_measured": [[-2.0, -2.0, -2.0, -2.0, -2.0, -2.0]],
                "Time": [[0, 10, 20, 30, 40, 50]]
            } }]
        })));
        let cycles = CycleExtractor::new(8, None).extract(&rec, &battery(), 10);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].voltage, vec![4.2, 4.1, 4.0, 3.9, 3.8, 3.7]);
        assert_eq!(cycles[0].time.len(), 6);
    }

    #[test]
    fn test_normalize_fixed_length_and_soc() {
        let rec = record(vec![entry("discharge", 11)]);
        let extractor = CycleExtractor::new(5, None);
        let cycle = &extractor.extract(&rec, &battery(), 1)[0];
        let row = extractor.normalize(cycle);
        for channel in [&row.voltage, &row.current, &row.temperature, &row.time, &row.soc] {
            assert_eq!(channel.len(), 5);
        }
        assert_eq!(row.soc, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
        assert_eq!(row.time[4], 10.0);
    }

    #[test]
    fn test_soc_ramp_without_time() {
        assert_eq!(soc_from_time(&[0.0, 0.0, 0.0], false), vec![1.0, 0.5, 0.0]);
        assert_eq!(soc_from_time(&[7.0, 7.0, 7.0], true), vec![1.0, 0.5, 0.0]);
    }
}
