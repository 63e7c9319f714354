// ============================================================
// Layer 3 — Raw and Canonical Records
// ============================================================
// Experimental records arrive as arbitrarily nested values:
// mappings, named-field aggregates (the "struct" shape that
// scientific file formats produce), numeric arrays, arrays of
// sub-records, and plain scalars.
//
// RawRecord models every shape we can be handed.
// CanonicalRecord is the normalised form the rest of the
// pipeline reads — only four shapes survive:
//
//   RawRecord                      CanonicalRecord
//   ─────────                      ───────────────
//   Map { k → v }            →     Mapping { k → normalize(v) }
//   Struct { fields }        →     Mapping { name → normalize(v) }
//   NumericArray [f64]       →     Numeric [f64]        (unchanged)
//   Array [all numbers]      →     Numeric [f64]
//   Array [mixed / records]  →     Sequence [normalize(e)]
//   Scalar                   →     Scalar               (unchanged)
//
// There is no error path. Input is a tree, so plain recursion
// terminates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A leaf value inside a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// A record exactly as loaded from the record store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Map(BTreeMap<String, RawRecord>),
    /// Named-field aggregate; field order is preserved but irrelevant downstream.
    /// The JSON store never yields this shape.
    #[allow(dead_code)]
    Struct(Vec<(String, RawRecord)>),
    NumericArray(Vec<f64>),
    Array(Vec<RawRecord>),
    Scalar(Scalar),
}

/// The recursively normalised form of a [`RawRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanonicalRecord {
    Mapping(BTreeMap<String, CanonicalRecord>),
    Sequence(Vec<CanonicalRecord>),
    Numeric(Vec<f64>),
    Scalar(Scalar),
}

/// Normalise a raw record into canonical form.
pub fn normalize(raw: RawRecord) -> CanonicalRecord {
    match raw {
        RawRecord::Map(map) => CanonicalRecord::Mapping(
            map.into_iter().map(|(k, v)| (k, normalize(v))).collect(),
        ),
        RawRecord::Struct(fields) => CanonicalRecord::Mapping(
            fields.into_iter().map(|(k, v)| (k, normalize(v))).collect(),
        ),
        RawRecord::NumericArray(values) => CanonicalRecord::Numeric(values),
        RawRecord::Array(items) => match numeric_elements(&items) {
            Some(values) => CanonicalRecord::Numeric(values),
            None => CanonicalRecord::Sequence(items.into_iter().map(normalize).collect()),
        },
        RawRecord::Scalar(s) => CanonicalRecord::Scalar(s),
    }
}

/// Returns the values if every element is a numeric scalar.
/// An empty array counts as numeric.
fn numeric_elements(items: &[RawRecord]) -> Option<Vec<f64>> {
    items
        .iter()
        .map(|item| match item {
            RawRecord::Scalar(Scalar::Number(n)) => Some(*n),
            _ => None,
        })
        .collect()
}

// ─── Conversions ──────────────────────────────────────────────────────────────

/// Lets an already-canonical record be fed back through [`normalize`].
impl From<CanonicalRecord> for RawRecord {
    fn from(record: CanonicalRecord) -> Self {
        match record {
            CanonicalRecord::Mapping(map) => {
                RawRecord::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            CanonicalRecord::Sequence(items) => {
                RawRecord::Array(items.into_iter().map(Into::into).collect())
            }
            CanonicalRecord::Numeric(values) => RawRecord::NumericArray(values),
            CanonicalRecord::Scalar(s) => RawRecord::Scalar(s),
        }
    }
}

/// JSON is the on-disk record format. Objects map to `Map`, arrays of
/// numbers to `NumericArray`, everything else element by element.
impl From<serde_json::Value> for RawRecord {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Object(obj) => {
                RawRecord::Map(obj.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            Value::Array(items) => {
                let numbers: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                match numbers {
                    Some(values) if !items.is_empty() => RawRecord::NumericArray(values),
                    _ => RawRecord::Array(items.into_iter().map(Into::into).collect()),
                }
            }
            Value::Number(n) => RawRecord::Scalar(
                n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            ),
            Value::String(s) => RawRecord::Scalar(Scalar::Text(s)),
            Value::Bool(b) => RawRecord::Scalar(Scalar::Bool(b)),
            Value::Null => RawRecord::Scalar(Scalar::Null),
        }
    }
}

// ─── Accessors ────────────────────────────────────────────────────────────────
// Small read helpers used by the cycle extractor. They never fail —
// a shape mismatch simply yields None.
impl CanonicalRecord {
    /// Look up a key if this is a mapping.
    pub fn get(&self, key: &str) -> Option<&CanonicalRecord> {
        match self {
            CanonicalRecord::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// First present key out of an ordered candidate list.
    pub fn get_first(&self, candidates: &[&str]) -> Option<&CanonicalRecord> {
        candidates.iter().find_map(|key| self.get(key))
    }

    /// Text content, unwrapping single-element sequences.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CanonicalRecord::Scalar(Scalar::Text(s)) => Some(s.as_str()),
            CanonicalRecord::Sequence(items) if items.len() == 1 => items[0].as_text(),
            _ => None,
        }
    }

    /// First numeric value found by descending into the first element
    /// of arrays and sequences. Numeric text is parsed.
    pub fn first_number(&self) -> Option<f64> {
        match self {
            CanonicalRecord::Scalar(Scalar::Number(n)) => Some(*n),
            CanonicalRecord::Scalar(Scalar::Text(s)) => s.trim().parse().ok(),
            CanonicalRecord::Numeric(values) => values.first().copied(),
            CanonicalRecord::Sequence(items) => items.first().and_then(Self::first_number),
            _ => None,
        }
    }

    /// The values as a flat numeric array; a lone number becomes a
    /// one-element array and a 1×N matrix becomes its single row.
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        match self {
            CanonicalRecord::Numeric(values) => Some(values.clone()),
            CanonicalRecord::Scalar(Scalar::Number(n)) => Some(vec![*n]),
            CanonicalRecord::Sequence(items)
                if items.len() == 1 && !matches!(items[0], CanonicalRecord::Scalar(_)) =>
            {
                items[0].as_numbers()
            }
            CanonicalRecord::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    CanonicalRecord::Scalar(Scalar::Number(n)) => Some(*n),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawRecord {
        RawRecord::Map(BTreeMap::from([
            (
                "cycle".to_string(),
                RawRecord::Array(vec![
                    RawRecord::Struct(vec![
                        ("type".into(), RawRecord::Scalar(Scalar::Text("discharge".into()))),
                        (
                            "data".into(),
                            RawRecord::Struct(vec![(
                                "Voltage_measured".into(),
                                RawRecord::NumericArray(vec![4.2, 4.0, 3.8]),
                            )]),
                        ),
                    ]),
                    RawRecord::Scalar(Scalar::Null),
                ]),
            ),
            ("name".to_string(), RawRecord::Scalar(Scalar::Text("B0005".into()))),
        ]))
    }

    #[test]
    fn test_struct_becomes_mapping() {
        let canonical = normalize(sample_raw());
        let first = match canonical.get("cycle") {
            Some(CanonicalRecord::Sequence(items)) => &items[0],
            other => panic!("expected sequence, got {other:?}"),
        };
        assert_eq!(first.get("type").and_then(CanonicalRecord::as_text), Some("discharge"));
        assert_eq!(
            first.get("data").and_then(|d| d.get("Voltage_measured")),
            Some(&CanonicalRecord::Numeric(vec![4.2, 4.0, 3.8]))
        );
    }

    #[test]
    fn test_array_of_numbers_becomes_numeric() {
        let raw = RawRecord::Array(vec![
            RawRecord::Scalar(Scalar::Number(1.0)),
            RawRecord::Scalar(Scalar::Number(2.0)),
        ]);
        assert_eq!(normalize(raw), CanonicalRecord::Numeric(vec![1.0, 2.0]));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(sample_raw());
        let twice = normalize(RawRecord::from(once.clone()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_scalar_passes_through() {
        let raw = RawRecord::Scalar(Scalar::Bool(true));
        assert_eq!(normalize(raw), CanonicalRecord::Scalar(Scalar::Bool(true)));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "cycle": [{ "type": "charge", "data": { "Current_measured": [1.0, 2.0] } }],
            "empty": [],
        });
        let canonical = normalize(RawRecord::from(json));
        assert_eq!(canonical.get("empty"), Some(&CanonicalRecord::Numeric(vec![])));
        match canonical.get("cycle") {
            Some(CanonicalRecord::Sequence(items)) => assert_eq!(items.len(), 1),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_first_number_descends_nested() {
        let nested = CanonicalRecord::Sequence(vec![CanonicalRecord::Numeric(vec![1.85, 1.7])]);
        assert_eq!(nested.first_number(), Some(1.85));
        let text = CanonicalRecord::Scalar(Scalar::Text("n/a".into()));
        assert_eq!(text.first_number(), None);
    }

    #[test]
    fn test_row_matrix_flattens_to_numbers() {
        let json = serde_json::json!({ "v": [[4.2, 4.1, 4.0]], "grid": [[1.0], [2.0]] });
        let canonical = normalize(RawRecord::from(json));
        assert_eq!(
            canonical.get("v").and_then(CanonicalRecord::as_numbers),
            Some(vec![4.2, 4.1, 4.0])
        );
        // Only a single row is flattened
        assert_eq!(canonical.get("grid").and_then(CanonicalRecord::as_numbers), None);
    }
}
