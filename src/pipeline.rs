//! Generation Orchestrator – drives one template plus one record set through
//! the full pipeline and hands the page data to the external render engine.
//!
//! Stage order is fixed: input checks, template validation, record selection,
//! sorting, filtering, formatting, duplicate expansion, template
//! preprocessing, pagination, rendering, post-render checks. Every failure is
//! terminal for the call and no partial output is returned.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;

use crate::config::{Config, Limits};
use crate::engine::RenderEngine;
use crate::error::GenerateError;
use crate::format::apply_formatting;
use crate::paginate::{chunk, Page};
use crate::preprocess::preprocess;
use crate::process::{apply_filters, apply_selection, apply_sorting, expand_duplicates};
use crate::record::Row;
use crate::validate::validate_template;
use crate::wrap::wrap_with_pages_loop;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("BUG: invalid TOKEN_RE regex literal"));

static KEYED_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\['([^']+)'\]").expect("BUG: invalid KEYED_COLUMN_RE regex literal")
});

static DOTTED_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.([A-Za-z0-9_]+)").expect("BUG: invalid DOTTED_COLUMN_RE regex literal")
});

/// Everything the external engine needs to render: the rewritten, wrapped
/// body mark-up and the assembled page data.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub body_xml: String,
    pub pages: Vec<Page>,
    pub items_per_page: usize,
    pub original_records: usize,
    pub filtered_records: usize,
    pub total_labels: usize,
}

/// Counters describing a completed generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateStats {
    pub original_records: usize,
    pub filtered_records: usize,
    pub total_labels: usize,
    pub pages: usize,
    pub items_per_page: usize,
    pub file_size_mb: f64,
}

/// The rendered document plus its run statistics.
#[derive(Debug, Clone)]
pub struct GenerateOutput {
    pub document: Vec<u8>,
    pub stats: GenerateStats,
}

/// Run every pipeline stage up to (but not including) rendering.
///
/// Validates the template against the headers, pushes the records through
/// selection, sorting, filtering, formatting, and duplicate expansion, then
/// rewrites the body mark-up and assembles the page data. Enforces the
/// expansion-ratio and page-count ceilings.
pub fn prepare(
    body_xml: &str,
    rows: &[Row],
    headers: &[String],
    config: &Config,
    limits: &Limits,
    on_progress: &mut dyn FnMut(&str),
) -> Result<Prepared, GenerateError> {
    if rows.is_empty() || headers.is_empty() {
        return Err(GenerateError::NoData);
    }
    if body_xml.trim().is_empty() {
        return Err(GenerateError::NoTemplate);
    }
    if !body_xml.contains("<w:") {
        return Err(GenerateError::InvalidTemplate(
            "no WordprocessingML mark-up found in the template body".into(),
        ));
    }

    validate_template(body_xml, headers)?;

    // The input count before selection, so the stats can show how much of
    // the sheet a narrowed selection left out.
    let original_records = rows.len();

    on_progress("Processing data...");
    let selected = apply_selection(rows, &config.record_selection);

    on_progress("Sorting data...");
    let sorted = apply_sorting(&selected, &config.sorting);
    let filtered = apply_filters(&sorted, &config.filters);
    let filtered_records = filtered.len();
    if filtered.is_empty() {
        return Err(GenerateError::NoData);
    }

    let formatted = apply_formatting(&filtered, &config.formatting);

    let labels = expand_duplicates(&formatted, &config.duplicates, limits, on_progress);
    let total_labels = labels.len();
    if total_labels > filtered_records * limits.max_duplicate_multiplier {
        return Err(GenerateError::ExpansionRatio {
            labels: total_labels,
            records: filtered_records,
            limit: limits.max_duplicate_multiplier,
        });
    }
    if labels.is_empty() {
        return Err(GenerateError::NoData);
    }

    on_progress("Preprocessing template...");
    let preprocessed = preprocess(body_xml, headers);
    let items_per_page = preprocessed.items_per_page;
    let wrapped = wrap_with_pages_loop(&preprocessed.xml);

    let page_estimate = total_labels.div_ceil(items_per_page.max(1));
    if page_estimate > limits.max_page_count {
        return Err(GenerateError::PageCount {
            pages: page_estimate,
            labels: total_labels,
            per_page: items_per_page,
            limit: limits.max_page_count,
        });
    }

    on_progress(&format!("Creating document ({page_estimate} pages)..."));
    let pages = chunk(&labels, items_per_page, on_progress);
    debug!(
        "prepared {} pages of {} slots from {} labels",
        pages.len(),
        items_per_page,
        total_labels
    );

    Ok(Prepared {
        body_xml: wrapped,
        pages,
        items_per_page,
        original_records,
        filtered_records,
        total_labels,
    })
}

/// Run the full generation pipeline.
///
/// `engine` owns the template buffer exclusively for the duration of the
/// call. `on_progress` receives a human-readable status line at every stage
/// transition and at bounded intervals inside the long stages.
pub fn generate(
    engine: &mut impl RenderEngine,
    rows: &[Row],
    headers: &[String],
    config: &Config,
    limits: &Limits,
    mut on_progress: impl FnMut(&str),
) -> Result<GenerateOutput, GenerateError> {
    let body_xml = engine.body_xml()?;
    let prepared = prepare(&body_xml, rows, headers, config, limits, &mut on_progress)?;
    engine.set_body_xml(prepared.body_xml)?;

    on_progress(&format!(
        "Rendering document ({} pages)...",
        prepared.pages.len()
    ));
    let document = engine.render(&prepared.pages)?;

    if let Some(text) = engine.full_text() {
        let leftovers = unresolved_columns(&text);
        if !leftovers.is_empty() {
            return Err(GenerateError::UnresolvedPlaceholders {
                columns: leftovers,
                available: headers.to_vec(),
            });
        }
    }

    let file_size_mb = document.len() as f64 / (1024.0 * 1024.0);
    if file_size_mb > limits.max_file_size_mb {
        return Err(GenerateError::FileSize {
            size_mb: file_size_mb,
            limit_mb: limits.max_file_size_mb,
        });
    }

    let stats = GenerateStats {
        original_records: prepared.original_records,
        filtered_records: prepared.filtered_records,
        total_labels: prepared.total_labels,
        pages: prepared.pages.len(),
        items_per_page: prepared.items_per_page,
        file_size_mb,
    };
    info!(
        "generated {} pages from {} labels ({} records), {:.2} MB",
        stats.pages, stats.total_labels, stats.filtered_records, stats.file_size_mb
    );

    Ok(GenerateOutput { document, stats })
}

/// Column names behind any tokens the engine left unsubstituted.
///
/// Indexed references give up their quoted or dotted key; loop tags are
/// structural and ignored. Order of first appearance, deduplicated.
fn unresolved_columns(full_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for caps in TOKEN_RE.captures_iter(full_text) {
        let tag = caps[1].trim();
        if tag == "#pages" || tag == "/pages" || tag == ":next" {
            continue;
        }

        let name = if let Some(keyed) = KEYED_COLUMN_RE.captures(tag) {
            keyed[1].to_string()
        } else if let Some(dotted) = DOTTED_COLUMN_RE.captures(tag) {
            dotted[1].to_string()
        } else if tag.contains("items[") {
            continue;
        } else {
            tag.to_string()
        };

        if seen.insert(name.clone()) {
            columns.push(name);
        }
    }
    columns
}
