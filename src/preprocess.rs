//! Placeholder Preprocessor – rewrites single-record placeholder syntax into
//! indexed per-page-slot references, directly on the body mark-up text.
//!
//! The authoring tool frequently splits a `{name}` token across several
//! adjacent `<w:t>` fragments inside one paragraph, so the first pass merges
//! such fragments back together (brace-balance scan). Page capacity is then
//! derived purely from counting `{:next}` slot markers, every placeholder is
//! rewritten to `{items[cursor]['name']}` with the cursor value effective at
//! its document position, and the markers are stripped.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use regex::{Captures, Regex};

/// The page-slot boundary marker.
pub const NEXT_MARKER: &str = "{:next}";

static PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p\b[^>]*>.*?</w:p>").expect("BUG: invalid PARAGRAPH_RE regex literal")
});

static TEXT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<w:t([^>]*)>([^<]*)</w:t>").expect("BUG: invalid TEXT_RUN_RE regex literal")
});

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("BUG: invalid TOKEN_RE regex literal"));

/// Result of template preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub xml: String,
    pub items_per_page: usize,
}

/// Control tags govern loop/section structure and are never data-bound.
pub fn is_control_tag(name: &str) -> bool {
    name.starts_with(['#', '/', '@', '.', ':']) || name == "pages"
}

/// A token binds to record data when it names a known column (exact match,
/// which wins over the control-tag heuristics) or is not a control tag.
fn is_bindable(tag: &str, columns: &HashSet<&str>) -> bool {
    if tag == ":next" {
        return false;
    }
    columns.contains(tag) || !is_control_tag(tag)
}

fn brace_delta(text: &str) -> i32 {
    let opens = text.matches('{').count() as i32;
    let closes = text.matches('}').count() as i32;
    opens - closes
}

/// Concatenated text of all `<w:t>` fragments, in document order.
pub fn extract_text(xml: &str) -> String {
    TEXT_RUN_RE
        .captures_iter(xml)
        .map(|caps| caps[2].to_string())
        .collect()
}

/// Merge text fragments the authoring tool split mid-token.
///
/// Works paragraph by paragraph: a paragraph without braces is returned
/// untouched; otherwise each `<w:t>` run is checked with a running brace
/// balance, and a run ending unbalanced is merged with following runs' text
/// (keeping the first run's attributes) until the balance returns to zero.
/// Idempotent: already-defragmented text comes back byte-identical.
pub fn defragment(xml: &str) -> String {
    PARAGRAPH_RE
        .replace_all(xml, |caps: &Captures| {
            let paragraph = caps.get(0).expect("BUG: group 0 always present").as_str();
            if !paragraph.contains('{') && !paragraph.contains('}') {
                return paragraph.to_string();
            }

            let full_text = extract_text(paragraph);
            if !full_text.contains('{') {
                return paragraph.to_string();
            }

            let mut balance = 0i32;
            let mut fragmented = false;
            for run in TEXT_RUN_RE.captures_iter(paragraph) {
                balance += brace_delta(&run[2]);
                if balance != 0 {
                    fragmented = true;
                    break;
                }
            }
            if !fragmented {
                return paragraph.to_string();
            }

            merge_fragmented(paragraph)
        })
        .into_owned()
}

struct TextSegment {
    start: usize,
    end: usize,
    attrs: String,
    text: String,
}

fn merge_fragmented(paragraph: &str) -> String {
    let segments: Vec<TextSegment> = TEXT_RUN_RE
        .captures_iter(paragraph)
        .map(|caps| {
            let whole = caps.get(0).expect("BUG: group 0 always present");
            TextSegment {
                start: whole.start(),
                end: whole.end(),
                attrs: caps[1].to_string(),
                text: caps[2].to_string(),
            }
        })
        .collect();

    let mut out = String::with_capacity(paragraph.len());
    let mut cursor = 0usize;
    let mut i = 0;
    while i < segments.len() {
        if brace_delta(&segments[i].text) == 0 {
            i += 1;
            continue;
        }

        // Unbalanced run: absorb following runs' text until balance returns
        // to zero (or the paragraph ends – unbalanced literal braces are
        // unsupported input and are left merged as-is).
        let mut combined = segments[i].text.clone();
        let mut end = segments[i].end;
        let mut j = i + 1;
        while brace_delta(&combined) != 0 && j < segments.len() {
            combined.push_str(&segments[j].text);
            end = segments[j].end;
            j += 1;
        }

        if j > i + 1 {
            out.push_str(&paragraph[cursor..segments[i].start]);
            out.push_str("<w:t");
            out.push_str(&segments[i].attrs);
            out.push('>');
            out.push_str(&combined);
            out.push_str("</w:t>");
            cursor = end;
        }
        i = j;
    }
    out.push_str(&paragraph[cursor..]);
    out
}

/// Page capacity from `{:next}` markers in the defragmented body.
///
/// `N` markers tentatively mean `N + 1` slots; a trailing marker with no
/// bindable token after it is spurious and does not open a slot.
fn detect_items_per_page(xml: &str, columns: &HashSet<&str>) -> usize {
    let text = extract_text(xml);
    let marker_count = text.matches(NEXT_MARKER).count();
    let mut items_per_page = marker_count + 1;

    if marker_count > 0 {
        if let Some(last) = text.rfind(NEXT_MARKER) {
            let after = &text[last + NEXT_MARKER.len()..];
            let has_bindable = TOKEN_RE
                .captures_iter(after)
                .any(|caps| is_bindable(caps[1].trim(), columns));
            if !has_bindable {
                items_per_page = (items_per_page - 1).max(1);
                debug!("ignoring trailing {{:next}}: no placeholders follow it");
            }
        }
    }

    debug!("{marker_count} {{:next}} markers, {items_per_page} items per page");
    items_per_page
}

/// Byte offsets of every `{:next}` marker, in document order.
fn marker_offsets(xml: &str) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut search_start = 0;
    while let Some(found) = xml[search_start..].find(NEXT_MARKER) {
        let offset = search_start + found;
        offsets.push(offset);
        search_start = offset + NEXT_MARKER.len();
    }
    offsets
}

/// The escaped single-quoted key used in the indexed slot reference.
fn escape_key(tag: &str) -> String {
    tag.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Rewrite every data placeholder to its indexed slot reference
/// `{items[cursor]['name']}`. `{:next}` markers and control tags are left in
/// place; markers are stripped by [`preprocess`] afterwards.
fn rewrite_placeholders(xml: &str, columns: &HashSet<&str>) -> String {
    let markers = marker_offsets(xml);

    TEXT_RUN_RE
        .replace_all(xml, |caps: &Captures| {
            let whole = caps.get(0).expect("BUG: group 0 always present");
            let text = &caps[2];
            if !text.contains('{') {
                return whole.as_str().to_string();
            }

            // Cursor effective at this fragment's document position.
            let cursor = markers.iter().filter(|&&m| whole.start() > m).count();

            let rewritten = TOKEN_RE.replace_all(text, |token: &Captures| {
                let tag = token[1].trim();
                if tag == ":next" {
                    return token[0].to_string();
                }
                if !columns.contains(tag) && is_control_tag(tag) {
                    return token[0].to_string();
                }
                format!("{{items[{cursor}]['{}']}}", escape_key(tag))
            });

            format!("<w:t{}>{}</w:t>", &caps[1], rewritten)
        })
        .into_owned()
}

/// Full preprocessing pass: defragment, detect capacity, rewrite
/// placeholders to indexed slot references, strip the slot markers.
/// Deterministic, pure function of its inputs.
pub fn preprocess(xml: &str, known_columns: &[String]) -> Preprocessed {
    let columns: HashSet<&str> = known_columns.iter().map(String::as_str).collect();

    let defragmented = defragment(xml);
    let items_per_page = detect_items_per_page(&defragmented, &columns);
    let rewritten = rewrite_placeholders(&defragmented, &columns);
    let xml = rewritten.replace(NEXT_MARKER, "");

    Preprocessed {
        xml,
        items_per_page,
    }
}

/// Unique data-placeholder names found in a template body, in document
/// order. Control tags and `{:next}` are excluded.
pub fn extract_placeholders(xml: &str) -> Vec<String> {
    let defragmented = defragment(xml);
    let text = extract_text(&defragmented);

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for caps in TOKEN_RE.captures_iter(&text) {
        let tag = caps[1].trim();
        if tag == ":next" || is_control_tag(tag) {
            continue;
        }
        if seen.insert(tag.to_string()) {
            names.push(tag.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(runs: &[&str]) -> String {
        let mut xml = String::from("<w:p>");
        for run in runs {
            xml.push_str("<w:r><w:t>");
            xml.push_str(run);
            xml.push_str("</w:t></w:r>");
        }
        xml.push_str("</w:p>");
        xml
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defragment_merges_split_token() {
        let xml = para(&["{Species ", "epithet}"]);
        let merged = defragment(&xml);
        assert_eq!(
            merged,
            "<w:p><w:r><w:t>{Species epithet}</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn defragment_merges_three_way_split() {
        let xml = para(&["{Gen", "us", "}"]);
        let merged = defragment(&xml);
        assert!(merged.contains("<w:t>{Genus}</w:t>"));
        assert_eq!(extract_text(&merged), "{Genus}");
    }

    #[test]
    fn defragment_keeps_first_run_attributes() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve">{Gen</w:t></w:r><w:r><w:t>us}</w:t></w:r></w:p>"#;
        let merged = defragment(xml);
        assert!(merged.contains(r#"<w:t xml:space="preserve">{Genus}</w:t>"#));
    }

    #[test]
    fn defragment_leaves_balanced_paragraphs_alone() {
        let xml = para(&["{Genus}", " plain text ", "{Locality}"]);
        assert_eq!(defragment(&xml), xml);
        let no_braces = para(&["nothing to see"]);
        assert_eq!(defragment(&no_braces), no_braces);
    }

    #[test]
    fn defragment_is_idempotent() {
        let xml = para(&["{Spec", "ies}", " and ", "{Loc", "ality}"]);
        let once = defragment(&xml);
        let twice = defragment(&once);
        assert_eq!(once, twice);
        assert_eq!(extract_text(&once), "{Species} and {Locality}");
    }

    #[test]
    fn defragment_unbalanced_merges_to_paragraph_end() {
        // Unsupported input: a lone open brace. Merged to the end, no panic.
        let xml = para(&["{never closed", " more text"]);
        let merged = defragment(&xml);
        assert_eq!(extract_text(&merged), "{never closed more text");
    }

    #[test]
    fn capacity_counts_markers_plus_one() {
        let xml = para(&["{Genus}", "{:next}", "{Genus}", "{:next}", "{Genus}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert_eq!(result.items_per_page, 3);
    }

    #[test]
    fn trailing_marker_without_placeholder_is_spurious() {
        let xml = para(&["{Genus}", "{:next}", "{Genus}", "{:next}", " tail text "]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert_eq!(result.items_per_page, 2);
    }

    #[test]
    fn all_trailing_markers_floor_at_one() {
        let xml = para(&["{:next}", " only markers "]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert_eq!(result.items_per_page, 1);
    }

    #[test]
    fn no_markers_means_one_per_page() {
        let xml = para(&["{Genus} {Locality}"]);
        let result = preprocess(&xml, &headers(&["Genus", "Locality"]));
        assert_eq!(result.items_per_page, 1);
    }

    #[test]
    fn unknown_token_after_last_marker_still_counts_as_bindable() {
        let xml = para(&["{Genus}", "{:next}", "{Typo}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert_eq!(result.items_per_page, 2);
    }

    #[test]
    fn control_tag_after_last_marker_does_not_count() {
        let xml = para(&["{Genus}", "{:next}", "{#loop}{/loop}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert_eq!(result.items_per_page, 1);
    }

    #[test]
    fn rewrite_assigns_cursor_per_slot() {
        let xml = para(&["{Genus}", "{:next}", "{Genus}", "{:next}", "{Genus}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert!(result.xml.contains("{items[0]['Genus']}"));
        assert!(result.xml.contains("{items[1]['Genus']}"));
        assert!(result.xml.contains("{items[2]['Genus']}"));
        assert!(!result.xml.contains(NEXT_MARKER));
    }

    #[test]
    fn rewrite_handles_fragmented_tokens() {
        let xml = para(&["{Gen", "us}", "{:next}", "{Gen", "us}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert!(result.xml.contains("{items[0]['Genus']}"));
        assert!(result.xml.contains("{items[1]['Genus']}"));
    }

    #[test]
    fn control_tags_survive_rewriting() {
        let xml = para(&["{#pages}", "{Genus}", "{/pages}", "{@raw}", "{.self}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert!(result.xml.contains("{#pages}"));
        assert!(result.xml.contains("{/pages}"));
        assert!(result.xml.contains("{@raw}"));
        assert!(result.xml.contains("{.self}"));
        assert!(result.xml.contains("{items[0]['Genus']}"));
    }

    #[test]
    fn known_column_wins_over_control_heuristics() {
        // A column literally named "#Count" must still bind.
        let xml = para(&["{#Count}"]);
        let result = preprocess(&xml, &headers(&["#Count"]));
        assert!(result.xml.contains("{items[0]['#Count']}"));
    }

    #[test]
    fn unknown_plausible_tokens_are_rewritten_anyway() {
        let xml = para(&["{NotAColumn}"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert!(result.xml.contains("{items[0]['NotAColumn']}"));
    }

    #[test]
    fn key_escaping_handles_quotes_and_backslashes() {
        let xml = para(&[r"{It's \ tricky}"]);
        let result = preprocess(&xml, &headers(&[r"It's \ tricky"]));
        assert!(result.xml.contains(r"{items[0]['It\'s \\ tricky']}"));
    }

    #[test]
    fn tag_content_is_trimmed_before_matching() {
        let xml = para(&["{ Genus }"]);
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert!(result.xml.contains("{items[0]['Genus']}"));
    }

    #[test]
    fn non_text_markup_is_untouched() {
        let xml = format!(
            r#"<w:document><w:body>{}<w:sectPr><w:pgSz w:w="11906"/></w:sectPr></w:body></w:document>"#,
            para(&["{Genus}"])
        );
        let result = preprocess(&xml, &headers(&["Genus"]));
        assert!(result.xml.contains(r#"<w:pgSz w:w="11906"/>"#));
        assert!(result.xml.starts_with("<w:document><w:body>"));
    }

    #[test]
    fn extract_placeholders_unique_in_order() {
        let xml = para(&[
            "{Genus}", "{:next}", "{Genus}", "{Locality}", "{#pages}", "{Collector}",
        ]);
        assert_eq!(
            extract_placeholders(&xml),
            vec!["Genus", "Locality", "Collector"]
        );
    }

    #[test]
    fn extract_placeholders_defragments_first() {
        let xml = para(&["{Gen", "us}"]);
        assert_eq!(extract_placeholders(&xml), vec!["Genus"]);
    }
}
