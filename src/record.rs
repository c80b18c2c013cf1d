//! Record model – the tabular data flowing through the pipeline.
//!
//! A [`Record`] is an order-irrelevant mapping from column name to cell
//! value. Hidden attributes (source row, cell type hints, duplication tags)
//! live in an explicit [`RecordMeta`] side channel rather than being smuggled
//! into the field map, and a [`Row`] carries the two together through every
//! pipeline stage.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single cell value: text, number, or empty.
///
/// Serialises as a bare JSON string / number / `""` so the external
/// templating engine sees plain values, not an enum wrapper.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl CellValue {
    /// Text rendition of the value. Whole numbers print without a decimal
    /// point, matching how spreadsheet exports display them.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Empty => String::new(),
        }
    }

    /// True for `Empty` and for whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Numeric interpretation, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Empty => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            // Padded page slots render as empty strings, not nulls.
            CellValue::Empty => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, a number, or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                if v.is_empty() {
                    Ok(CellValue::Empty)
                } else {
                    Ok(CellValue::Text(v.to_string()))
                }
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                Ok(CellValue::Number(v as f64))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<CellValue, E> {
                Ok(CellValue::Text(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Empty)
            }

            fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Empty)
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

/// One data record: column name → cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    /// Text rendition of a column, empty string when absent.
    pub fn text(&self, column: &str) -> String {
        self.fields
            .get(column)
            .map(CellValue::to_text)
            .unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the value of an existing or new column.
    pub fn set(&mut self, column: &str, value: CellValue) {
        self.fields.insert(column.to_string(), value);
    }

    /// A record with the same column keys but every value empty – used to pad
    /// the final page up to capacity.
    pub fn empty_like(&self) -> Record {
        Record {
            fields: self
                .fields
                .keys()
                .map(|k| (k.clone(), CellValue::Empty))
                .collect(),
        }
    }

    /// True when every cell is blank.
    pub fn is_all_blank(&self) -> bool {
        self.fields.values().all(CellValue::is_blank)
    }
}

impl FromIterator<(String, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Record {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Spreadsheet-supplied type hint for one cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CellHint {
    /// The source cell carried a date number format.
    #[serde(default)]
    pub is_date: bool,
    /// Raw number-format string from the workbook, when present.
    #[serde(default)]
    pub number_format: Option<String>,
}

/// Hidden per-record attributes. These must survive copying, filtering,
/// sorting, and duplication.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordMeta {
    /// 1-based row index in the source sheet (header excluded).
    pub source_row: Option<usize>,
    /// Per-column cell hints from the spreadsheet reader.
    pub hints: HashMap<String, CellHint>,
    /// 1-based source-record index, set by collated duplicate expansion.
    pub set_number: Option<usize>,
    /// 1-based copy number, set by collated duplicate expansion.
    pub copy_number: Option<usize>,
}

impl RecordMeta {
    pub fn hint(&self, column: &str) -> Option<&CellHint> {
        self.hints.get(column)
    }
}

/// A record together with its hidden attributes – the unit every pipeline
/// stage consumes and produces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub record: Record,
    pub meta: RecordMeta,
}

impl Row {
    pub fn new(record: Record) -> Self {
        Self {
            record,
            meta: RecordMeta::default(),
        }
    }

    pub fn with_source_row(record: Record, source_row: usize) -> Self {
        Self {
            record,
            meta: RecordMeta {
                source_row: Some(source_row),
                ..RecordMeta::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
            .collect()
    }

    #[test]
    fn cell_value_text_rendition() {
        assert_eq!(CellValue::Text("abc".into()).to_text(), "abc");
        assert_eq!(CellValue::Number(5.0).to_text(), "5");
        assert_eq!(CellValue::Number(5.25).to_text(), "5.25");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn cell_value_serializes_bare() {
        assert_eq!(serde_json::to_string(&CellValue::Text("x".into())).unwrap(), "\"x\"");
        assert_eq!(serde_json::to_string(&CellValue::Empty).unwrap(), "\"\"");
    }

    #[test]
    fn cell_value_deserializes_from_json_scalars() {
        let v: CellValue = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(v, CellValue::Text("hello".into()));
        let v: CellValue = serde_json::from_str("3.5").unwrap();
        assert_eq!(v, CellValue::Number(3.5));
        let v: CellValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, CellValue::Empty);
        let v: CellValue = serde_json::from_str("\"\"").unwrap();
        assert_eq!(v, CellValue::Empty);
    }

    #[test]
    fn record_round_trips_as_plain_object() {
        let r = record(&[("Genus", "Carex"), ("Count", "3")]);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"Count":"3","Genus":"Carex"}"#);
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn empty_like_keeps_keys_clears_values() {
        let r = record(&[("Genus", "Carex"), ("Locality", "Bog")]);
        let empty = r.empty_like();
        assert_eq!(
            empty.columns().collect::<Vec<_>>(),
            r.columns().collect::<Vec<_>>()
        );
        assert!(empty.is_all_blank());
    }

    #[test]
    fn meta_survives_cloning() {
        let mut row = Row::with_source_row(record(&[("A", "1")]), 7);
        row.meta
            .hints
            .insert("A".into(), CellHint { is_date: true, number_format: None });
        let copy = row.clone();
        assert_eq!(copy.meta.source_row, Some(7));
        assert!(copy.meta.hint("A").unwrap().is_date);
    }
}
