//! Record Pipeline stages – selection, sorting, filtering, and duplicate
//! expansion, run strictly in that order (formatting sits between filtering
//! and expansion; see [`crate::format`]).
//!
//! Every stage is copy-on-write: it borrows its input list and returns a new
//! one, so intermediate results stay inspectable.

use std::cmp::Ordering;

use log::warn;

use crate::config::{progress, Collation, DuplicateMode, Duplicates, Filter, Limits, RecordSelection, SortOrder, Sorting};
use crate::format;
use crate::record::{CellValue, Row};

/// Keep the inclusive 1-indexed row range. An absent or out-of-range end
/// means "all remaining".
pub fn apply_selection(rows: &[Row], selection: &RecordSelection) -> Vec<Row> {
    let start = selection.start_row.max(1) - 1;
    let end = selection
        .end_row
        .unwrap_or(rows.len())
        .min(rows.len());
    if start >= end {
        return Vec::new();
    }
    rows[start..end].to_vec()
}

/// Sort-locale for the date trial. Delimited dates in sort keys are read
/// month-first, independent of the formatting locale.
const SORT_DATE_LOCALE: &str = "en-US";

fn compare_cells(a: &CellValue, b: &CellValue, order: SortOrder) -> Ordering {
    let a_blank = a.is_blank();
    let b_blank = b.is_blank();

    // Empties sort last regardless of direction.
    match (a_blank, b_blank) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ordering = if let (Some(na), Some(nb)) = (a.as_number(), b.as_number()) {
        na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
    } else if let (Some(da), Some(db)) = (
        format::parse_date(&a.to_text(), SORT_DATE_LOCALE),
        format::parse_date(&b.to_text(), SORT_DATE_LOCALE),
    ) {
        da.cmp(&db)
    } else {
        a.to_text().to_lowercase().cmp(&b.to_text().to_lowercase())
    };

    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

/// Stable multi-key sort; later rules break ties left by earlier ones.
pub fn apply_sorting(rows: &[Row], sorting: &Sorting) -> Vec<Row> {
    if !sorting.enabled || sorting.rules.is_empty() {
        return rows.to_vec();
    }

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        for rule in &sorting.rules {
            if rule.column.is_empty() {
                continue;
            }
            let va = a.record.get(&rule.column).cloned().unwrap_or_default();
            let vb = b.record.get(&rule.column).cloned().unwrap_or_default();
            let ordering = compare_cells(&va, &vb, rule.order);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    sorted
}

/// Keep a row iff every filter's column value contains the filter value,
/// case-insensitively. Filters missing a column or value are ignored.
pub fn apply_filters(rows: &[Row], filters: &[Filter]) -> Vec<Row> {
    let active: Vec<&Filter> = filters
        .iter()
        .filter(|f| !f.column.is_empty() && !f.value.is_empty())
        .collect();
    if active.is_empty() {
        return rows.to_vec();
    }

    rows.iter()
        .filter(|row| {
            active.iter().all(|f| {
                row.record
                    .text(&f.column)
                    .to_lowercase()
                    .contains(&f.value.to_lowercase())
            })
        })
        .cloned()
        .collect()
}

/// `parseInt`-style leading-integer read of a count cell.
fn leading_integer(value: &CellValue) -> i64 {
    match value {
        CellValue::Number(n) => n.trunc() as i64,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            let (sign, digits) = match trimmed.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, trimmed),
            };
            let leading: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
            leading.parse::<i64>().map(|n| sign * n).unwrap_or(0)
        }
        CellValue::Empty => 0,
    }
}

/// Copy count for one record; clamped to ≥ 0 (0 drops the record).
pub fn duplicate_count(row: &Row, duplicates: &Duplicates) -> usize {
    let count = match duplicates.mode {
        DuplicateMode::Column => match &duplicates.column {
            Some(column) => {
                let base = row
                    .record
                    .get(column)
                    .map(leading_integer)
                    .unwrap_or(0);
                base + duplicates.add_subtract
            }
            None => 1,
        },
        DuplicateMode::Fixed => duplicates.fixed,
    };
    count.max(0) as usize
}

/// Expand rows into their configured number of copies.
///
/// Uncollated emits all copies of a record consecutively; collated emits one
/// full pass per copy number, tagging each emitted copy with its 1-based
/// source index and copy number in the metadata side channel.
pub fn expand_duplicates(
    rows: &[Row],
    duplicates: &Duplicates,
    limits: &Limits,
    on_progress: &mut dyn FnMut(&str),
) -> Vec<Row> {
    let total = rows.len();
    let mut result = Vec::new();

    match duplicates.collate {
        Collation::Uncollated => {
            for (i, row) in rows.iter().enumerate() {
                let count = duplicate_count(row, duplicates);
                if count as i64 > limits.max_duplicate_count {
                    warn!("row {i} has a duplicate count of {count}");
                }
                for _ in 0..count {
                    result.push(row.clone());
                }
                if i % progress::RECORD_INTERVAL == 0 {
                    let percent = (i * 100) / total.max(1);
                    on_progress(&format!(
                        "Processing duplicates ({} of {total} records, {percent}%)...",
                        i + 1
                    ));
                }
            }
        }
        Collation::Collated => {
            let counts: Vec<usize> = rows
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    let count = duplicate_count(row, duplicates);
                    if count as i64 > limits.max_duplicate_count {
                        warn!("row {i} has a duplicate count of {count}");
                    }
                    count
                })
                .collect();
            let max_copies = counts.iter().copied().max().unwrap_or(0);

            for copy in 0..max_copies {
                for (i, row) in rows.iter().enumerate() {
                    if counts[i] > copy {
                        let mut duplicate = row.clone();
                        duplicate.meta.set_number = Some(i + 1);
                        duplicate.meta.copy_number = Some(copy + 1);
                        result.push(duplicate);
                    }
                }
                if copy % progress::CHUNK_INTERVAL == 0 {
                    let percent = (copy * 100) / max_copies.max(1);
                    on_progress(&format!(
                        "Processing duplicates (set {} of {max_copies}, {percent}%)...",
                        copy + 1
                    ));
                }
            }
        }
    }

    result
}
