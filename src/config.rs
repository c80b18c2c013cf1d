//! Generation configuration – record selection, sorting, filters, duplicate
//! expansion, value formatting, and safety ceilings.
//!
//! Every field carries a serde default so a partially persisted or
//! schema-drifted JSON config still deserialises onto structural defaults.
//! Key names are camelCase to match the persisted session format.

use serde::{Deserialize, Serialize};

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub record_selection: RecordSelection,
    pub sorting: Sorting,
    pub filters: Vec<Filter>,
    pub duplicates: Duplicates,
    pub formatting: Formatting,
}

/// Inclusive 1-indexed row range to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordSelection {
    pub start_row: usize,
    /// `None` (or past the end) means "all remaining".
    pub end_row: Option<usize>,
}

impl Default for RecordSelection {
    fn default() -> Self {
        Self {
            start_row: 1,
            end_row: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sorting {
    pub enabled: bool,
    /// Applied in listed priority order as tie-breaks.
    pub rules: Vec<SortRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SortRule {
    pub column: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Case-insensitive substring filter on one column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Duplicates {
    pub mode: DuplicateMode,
    /// Column holding the per-record copy count (`mode == Column`).
    pub column: Option<String>,
    /// Offset added to the column-derived count.
    pub add_subtract: i64,
    /// Copy count for every record (`mode == Fixed`).
    pub fixed: i64,
    pub collate: Collation,
}

impl Default for Duplicates {
    fn default() -> Self {
        Self {
            mode: DuplicateMode::Fixed,
            column: None,
            add_subtract: 0,
            fixed: 1,
            collate: Collation::Uncollated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateMode {
    Column,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collation {
    /// `[r1, r2, r3, r1, r2, ...]` – one pass per copy number.
    Collated,
    /// `[r1, r1, r1, r2, r2, ...]` – all copies of a record together.
    Uncollated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Formatting {
    pub date: DateFormatting,
    pub decimal_format: DecimalSeparator,
    pub geocoord: Geocoord,
    /// Columns exempt from all value formatting.
    pub skip_columns: Vec<String>,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            date: DateFormatting::default(),
            decimal_format: DecimalSeparator::Dot,
            geocoord: Geocoord::default(),
            skip_columns: vec!["sort #".into(), "CollNb".into(), "Initials".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateFormatting {
    pub mode: DateMode,
    /// Columns to reformat when `mode == Column`.
    pub columns: Vec<String>,
    pub format: DateStyle,
    /// BCP 47 locale code driving month names and day-first resolution.
    pub locale: String,
}

impl Default for DateFormatting {
    fn default() -> Self {
        Self {
            mode: DateMode::None,
            columns: Vec::new(),
            format: DateStyle::Roman,
            locale: "en-US".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    #[default]
    None,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateStyle {
    /// `DD-XII-YYYY`
    #[default]
    Roman,
    /// `YYYY-MM-DD`
    Iso,
    /// `January 03, 2024` (localized long month)
    English,
    /// `Jan 03, 2024` (localized short month)
    Short,
    /// `03 JAN 2024`
    #[serde(rename = "threeletter")]
    ThreeLetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Dot,
    Comma,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Geocoord {
    pub mode: GeocoordMode,
    /// One cell holding "lat lon" (`mode == Single`).
    pub single_column: Option<String>,
    pub lat_column: Option<String>,
    pub lon_column: Option<String>,
    pub output_format: GeocoordFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoordMode {
    #[default]
    None,
    Single,
    Separate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeocoordFormat {
    /// `12°34'56.7"N`
    #[default]
    #[serde(rename = "dms")]
    Dms,
    /// `12.582417N`
    #[serde(rename = "decimal-direction")]
    DecimalDirection,
    /// `-12.582417`
    #[serde(rename = "decimal-signed")]
    DecimalSigned,
}

/// Safety ceilings – generation aborts rather than silently producing an
/// oversized document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Limits {
    /// Per-row copy counts above this only log a warning.
    pub max_duplicate_count: i64,
    /// Expansion may not exceed this multiple of the input size.
    pub max_duplicate_multiplier: usize,
    pub max_page_count: usize,
    pub max_file_size_mb: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_duplicate_count: 50,
            max_duplicate_multiplier: 100,
            max_page_count: 10_000,
            max_file_size_mb: 50.0,
        }
    }
}

/// Progress-checkpoint cadences for long stages.
pub mod progress {
    /// Records between checkpoints during uncollated expansion.
    pub const RECORD_INTERVAL: usize = 10;
    /// Copy passes / pages between checkpoints.
    pub const CHUNK_INTERVAL: usize = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.record_selection.start_row, 1);
        assert!(cfg.record_selection.end_row.is_none());
        assert!(!cfg.sorting.enabled);
        assert_eq!(cfg.duplicates.fixed, 1);
        assert_eq!(cfg.duplicates.collate, Collation::Uncollated);
        assert_eq!(cfg.formatting.decimal_format, DecimalSeparator::Dot);
        assert_eq!(cfg.formatting.date.locale, "en-US");
    }

    #[test]
    fn partial_json_merges_onto_defaults() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "duplicates": { "mode": "column", "column": "Qty", "collate": "collated" },
                "formatting": { "decimalFormat": "comma" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.duplicates.mode, DuplicateMode::Column);
        assert_eq!(cfg.duplicates.column.as_deref(), Some("Qty"));
        assert_eq!(cfg.duplicates.collate, Collation::Collated);
        // Untouched siblings keep their structural defaults.
        assert_eq!(cfg.duplicates.fixed, 1);
        assert_eq!(cfg.formatting.decimal_format, DecimalSeparator::Comma);
        assert_eq!(cfg.formatting.skip_columns.len(), 3);
    }

    #[test]
    fn enum_wire_names() {
        let g: GeocoordFormat = serde_json::from_str("\"decimal-direction\"").unwrap();
        assert_eq!(g, GeocoordFormat::DecimalDirection);
        let d: DateStyle = serde_json::from_str("\"threeletter\"").unwrap();
        assert_eq!(d, DateStyle::ThreeLetter);
    }

    #[test]
    fn limits_defaults() {
        let l = Limits::default();
        assert_eq!(l.max_duplicate_multiplier, 100);
        assert_eq!(l.max_page_count, 10_000);
    }
}
