// ============================================================
// Layer 6 — Row Store (wide CSV)
// ============================================================
// The hand-off between `prepare` and `train`: one row per
// accepted cycle, metadata first, then L columns per channel.
//
//   battery_id,cycle_id,timestamp,...,duty_cycle,
//   voltage_0..voltage_{L-1},current_0..,temperature_0..,
//   time_0..,soc_0..soc_{L-1}
//
// Missing optional values are empty cells. L is recovered on
// read from the number of `voltage_*` columns.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::domain::battery::{BatteryMetadata, DischargeParams};
use crate::domain::cycle::NormalizedCycle;

const META_COLUMNS: [&str; 14] = [
    "battery_id",
    "cycle_id",
    "timestamp",
    "ambient_temperature",
    "capacity",
    "usable",
    "path",
    "nominal_capacity",
    "fade_percent",
    "cutoff_voltage",
    "discharge_type",
    "amplitude",
    "frequency",
    "duty_cycle",
];

const CHANNELS: [&str; 5] = ["voltage", "current", "temperature", "time", "soc"];

fn header(seq_len: usize) -> Vec<String> {
    let mut cols: Vec<String> = META_COLUMNS.iter().map(|c| c.to_string()).collect();
    for channel in CHANNELS {
        cols.extend((0..seq_len).map(|i| format!("{channel}_{i}")));
    }
    cols
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write every row to `path`, replacing any previous file.
pub fn write_rows(path: impl AsRef<Path>, rows: &[NormalizedCycle]) -> Result<()> {
    let path = path.as_ref();
    let Some(first) = rows.first() else {
        bail!("Refusing to write an empty row store to '{}'", path.display());
    };
    let seq_len = first.len();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create row store '{}'", path.display()))?;
    w.write_record(header(seq_len))?;

    for row in rows {
        if row.len() != seq_len {
            bail!("Cycle {} of '{}' has length {}, expected {}", row.cycle_id, row.battery.id, row.len(), seq_len);
        }
        let b = &row.battery;
        let mut record = vec![
            b.id.clone(),
            row.cycle_id.to_string(),
            row.timestamp.clone(),
            opt(row.ambient_temperature),
            opt(row.capacity),
            b.usable.to_string(),
            b.path.clone(),
            opt(b.nominal_capacity),
            opt(b.fade_percent),
            opt(b.discharge.cutoff_voltage),
            b.discharge.kind.clone().unwrap_or_default(),
            opt(b.discharge.amplitude),
            opt(b.discharge.frequency),
            opt(b.discharge.duty_cycle),
        ];
        for values in [&row.voltage, &row.current, &row.temperature, &row.time, &row.soc] {
            record.extend(values.iter().map(|v| v.to_string()));
        }
        w.write_record(&record)?;
    }
    w.flush()?;
    tracing::info!("Wrote {} rows (L={}) to '{}'", rows.len(), seq_len, path.display());
    Ok(())
}

/// Read back every row written by `write_rows`.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<NormalizedCycle>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot open row store '{}'. Have you run 'prepare' first?", path.display()))?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Row store '{}' has no '{name}' column", path.display()))
    };
    let meta: Vec<usize> = META_COLUMNS.iter().map(|c| column(*c)).collect::<Result<_>>()?;
    let seq_len = headers.iter().filter(|h| h.starts_with("voltage_")).count();
    let starts: Vec<usize> = CHANNELS
        .iter()
        .map(|c| column(format!("{c}_0").as_str()))
        .collect::<Result<_>>()?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |i: usize| record.get(meta[i]).unwrap_or("");
        let number = |i: usize| -> Result<Option<f64>> {
            match cell(i) {
                "" => Ok(None),
                s  => s.parse::<f64>().map(Some).with_context(|| {
                    format!("Row {}: bad {} value '{s}'", line + 1, META_COLUMNS[i])
                }),
            }
        };
        let channel = |c: usize| -> Result<Vec<f64>> {
            (starts[c]..starts[c] + seq_len)
                .map(|i| {
                    let s = record.get(i).unwrap_or("");
                    s.parse::<f64>().with_context(|| {
                        format!("Row {}: bad {} sample '{s}'", line + 1, CHANNELS[c])
                    })
                })
                .collect()
        };

        let battery = BatteryMetadata {
            id:               cell(0).to_string(),
            usable:           cell(5) != "false",
            path:             cell(6).to_string(),
            nominal_capacity: number(7)?,
            fade_percent:     number(8)?,
            discharge: DischargeParams {
                cutoff_voltage: number(9)?,
                kind:           Some(cell(10).to_string()).filter(|s| !s.is_empty()),
                amplitude:      number(11)?,
                frequency:      number(12)?,
                duty_cycle:     number(13)?,
            },
        };

        rows.push(NormalizedCycle {
            battery,
            cycle_id: cell(1)
                .parse()
                .with_context(|| format!("Row {}: bad cycle_id '{}'", line + 1, cell(1)))?,
            timestamp:           cell(2).to_string(),
            ambient_temperature: number(3)?,
            capacity:            number(4)?,
            voltage:             channel(0)?,
            current:             channel(1)?,
            temperature:         channel(2)?,
            time:                channel(3)?,
            soc:                 channel(4)?,
        });
    }

    tracing::info!("Read {} rows (L={}) from '{}'", rows.len(), seq_len, path.display());
    Ok(rows)
}
