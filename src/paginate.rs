//! Pagination assembler – splits the flat record stream into fixed-size
//! pages matching the template's slot count.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::progress;
use crate::record::{Record, Row};

/// One output page: exactly `items_per_page` records, the tail padded with
/// blank records so every slot reference resolves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Record>,
}

impl Page {
    pub fn new(items: Vec<Record>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Chunk the expanded record stream into pages of `items_per_page` slots.
///
/// Produces `ceil(n / items_per_page)` pages, every one exactly
/// `items_per_page` long; the final page is padded with blank records that
/// carry the same column set as the data. Empty input yields zero pages.
pub fn chunk(
    rows: &[Row],
    items_per_page: usize,
    on_progress: &mut dyn FnMut(&str),
) -> Vec<Page> {
    let per_page = items_per_page.max(1);
    if rows.is_empty() {
        return Vec::new();
    }

    let total_pages = rows.len().div_ceil(per_page);
    let mut pages = Vec::with_capacity(total_pages);

    for (page_index, slice) in rows.chunks(per_page).enumerate() {
        let mut items: Vec<Record> = slice.iter().map(|row| row.record.clone()).collect();
        while items.len() < per_page {
            items.push(slice[0].record.empty_like());
        }
        pages.push(Page::new(items));

        if (page_index + 1) % progress::CHUNK_INTERVAL == 0 || page_index + 1 == total_pages {
            let percent = (page_index + 1) * 100 / total_pages;
            on_progress(&format!(
                "Preparing pages ({} of {total_pages}, {percent}%)...",
                page_index + 1
            ));
        }
    }

    debug!(
        "chunked {} records into {} pages of {} slots",
        rows.len(),
        pages.len(),
        per_page
    );
    pages
}
