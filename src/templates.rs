//! Sample label-template bodies for testing and demonstration.
//!
//! Each template is a complete `word/document.xml` body exercising a
//! different authoring pattern: single label per page, multi-slot pages with
//! `{:next}` markers, fragmented placeholder runs, and table layouts.

/// One herbarium label per page, plain paragraphs.
pub fn single_label_template() -> &'static str {
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p><w:p><w:r><w:t>{Locality}</w:t></w:r></w:p><w:p><w:r><w:t>Coll. {Collector}, {Date}</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
}

/// Two labels per page, separated by a `{:next}` slot marker.
pub fn two_slot_template() -> &'static str {
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p><w:p><w:r><w:t>{Locality}</w:t></w:r></w:p><w:p><w:r><w:t>{:next}</w:t></w:r></w:p><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p><w:p><w:r><w:t>{Locality}</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
}

/// Placeholders split across adjacent text runs, as word processors often
/// save them after in-place edits.
pub fn fragmented_template() -> &'static str {
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:rPr><w:i/></w:rPr><w:t>{Gen</w:t></w:r><w:r><w:t>us}</w:t></w:r><w:r><w:t xml:space="preserve"> {Spec</w:t></w:r><w:r><w:t>ies}</w:t></w:r></w:p><w:p><w:r><w:t>{Locality}</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
}

/// Four labels laid out in a 2x2 table, one slot per cell.
pub fn table_template() -> &'static str {
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:tbl><w:tr><w:tc><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{:next}</w:t></w:r></w:p><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t>{:next}</w:t></w:r></w:p><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{:next}</w:t></w:r></w:p><w:p><w:r><w:t>{Genus} {Species}</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
}

/// Minimal body for unit testing.
pub fn minimal_template() -> &'static str {
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>{Genus}</w:t></w:r></w:p></w:body></w:document>"#
}

/// Column headers matching every sample template above.
pub fn sample_headers() -> Vec<String> {
    ["Genus", "Species", "Locality", "Collector", "Date"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
