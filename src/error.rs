//! Error taxonomy for a generation run.
//!
//! Input problems are reported before any work starts, validation and bounds
//! problems before rendering, and render problems after the external engine
//! has run. Every error is terminal for the current call – no partial output.

use thiserror::Error;

use crate::engine::EngineError;

#[derive(Debug, Error)]
pub enum GenerateError {
    // ---- Input ----
    #[error("no template data provided")]
    NoTemplate,

    #[error("no source data to generate from")]
    NoData,

    #[error("invalid template format: {0}")]
    InvalidTemplate(String),

    // ---- Validation ----
    #[error("template references missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error(
        "numbered placeholders for '{column}' have gaps: missing {}",
        format_numbers(missing)
    )]
    PlaceholderNumberingGap { column: String, missing: Vec<usize> },

    // ---- Bounds ----
    #[error(
        "duplicate handling created {labels} labels from {records} records \
         (over {limit}x the input); check the duplicate settings"
    )]
    ExpansionRatio {
        labels: usize,
        records: usize,
        limit: usize,
    },

    #[error(
        "would generate {pages} pages ({labels} labels at {per_page} per page), \
         above the {limit}-page ceiling; check duplicate column values, record \
         selection, and template structure"
    )]
    PageCount {
        pages: usize,
        labels: usize,
        per_page: usize,
        limit: usize,
    },

    #[error("generated document is {size_mb:.2} MB, above the {limit_mb:.0} MB ceiling")]
    FileSize { size_mb: f64, limit_mb: f64 },

    // ---- Render ----
    #[error("template rendering failed: {0}")]
    Render(#[from] EngineError),

    #[error(
        "rendering left unresolved placeholders: {}; available columns: {}. \
         Placeholder names must match the column headers exactly (case-sensitive)",
        .columns.join(", "),
        .available.join(", ")
    )]
    UnresolvedPlaceholders {
        columns: Vec<String>,
        available: Vec<String>,
    },
}

fn format_numbers(numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(|n| format!("#{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_enumerate_names_and_numbers() {
        let err = GenerateError::MissingColumns(vec!["Genus".into(), "Locality".into()]);
        assert_eq!(
            err.to_string(),
            "template references missing columns: Genus, Locality"
        );

        let err = GenerateError::PlaceholderNumberingGap {
            column: "Genus".into(),
            missing: vec![2, 4],
        };
        assert!(err.to_string().contains("#2, #4"));
    }

    #[test]
    fn bounds_errors_cite_offending_numbers() {
        let err = GenerateError::PageCount {
            pages: 20_000,
            labels: 40_000,
            per_page: 2,
            limit: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("20000 pages"));
        assert!(msg.contains("10000-page ceiling"));
    }
}
