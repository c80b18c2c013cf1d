//! Pagination wrapper – encloses the document body in a `{#pages}` /
//! `{/pages}` repetition loop with a page break between iterations.
//!
//! Section properties trailing the body (`<w:sectPr>`) must stay outside the
//! loop or the engine duplicates page geometry on every page. Tables are
//! enclosed whole; splitting a table across the loop boundary produces
//! invalid mark-up.

use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

const PAGES_OPEN: &str = "<w:p><w:r><w:t>{#pages}</w:t></w:r></w:p>";
const PAGES_CLOSE: &str = "<w:p><w:r><w:t>{/pages}</w:t></w:r></w:p>";
const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

static SECT_PR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:sectPr.*?</w:sectPr>\s*$").expect("BUG: invalid SECT_PR_RE regex literal")
});

/// Wrap the body content in the pages loop. Idempotent: a template that
/// already carries the loop tags is returned unchanged, as is mark-up
/// without a recognizable body element.
pub fn wrap_with_pages_loop(xml: &str) -> String {
    if xml.contains("{#pages}") && xml.contains("{/pages}") {
        debug!("template already carries a pages loop");
        return xml.to_string();
    }

    let Some(open) = xml.find("<w:body>") else {
        warn!("no <w:body> element found, leaving template unwrapped");
        return xml.to_string();
    };
    let body_start = open + "<w:body>".len();
    let Some(body_end) = xml.find("</w:body>") else {
        warn!("no </w:body> element found, leaving template unwrapped");
        return xml.to_string();
    };

    let body = &xml[body_start..body_end];
    let (content, sect_pr) = match SECT_PR_RE.find(body) {
        Some(m) => (&body[..m.start()], m.as_str()),
        None => (body, ""),
    };

    let wrapped = if content.contains("<w:tbl>") {
        wrap_table_content(content)
    } else {
        wrap_simple_content(content)
    };

    format!(
        "{}{}{}{}",
        &xml[..body_start],
        wrapped,
        sect_pr,
        &xml[body_end..]
    )
}

fn wrap_simple_content(content: &str) -> String {
    format!("{PAGES_OPEN}{content}{PAGE_BREAK}{PAGES_CLOSE}")
}

/// Table-bearing bodies keep every table whole inside one loop iteration:
/// the loop opens before the first `<w:tbl>` block and closes after the last.
fn wrap_table_content(content: &str) -> String {
    let (Some(first), Some(last)) = (content.find("<w:tbl>"), content.rfind("</w:tbl>")) else {
        return wrap_simple_content(content);
    };
    let tables_end = last + "</w:tbl>".len();

    let before = &content[..first];
    let tables = &content[first..tables_end];
    let after = &content[tables_end..];

    format!("{PAGES_OPEN}{before}{tables}{after}{PAGE_BREAK}{PAGES_CLOSE}")
}
