//! Pre-render template validation – every placeholder must resolve to a
//! spreadsheet column before any page is assembled.
//!
//! Two authoring styles are accepted: plain placeholders (`{Genus}`) that
//! name a column directly, and numbered placeholders (`{Genus#1}`,
//! `{Genus#2}`) that address one slot each on a multi-label sheet. Numbered
//! sets must start at 1 and be gap-free or slots silently render blank.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::GenerateError;
use crate::preprocess::extract_placeholders;

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)#(\d+)$").expect("BUG: invalid NUMBERED_RE regex literal")
});

/// Check every data placeholder in a template body against the available
/// column headers.
///
/// Reports all missing columns at once rather than failing on the first, and
/// checks numbered placeholder sets for numbering gaps.
pub fn validate_template(body_xml: &str, headers: &[String]) -> Result<(), GenerateError> {
    let placeholders = extract_placeholders(body_xml);

    let mut missing = Vec::new();
    let mut numbered: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for name in &placeholders {
        // A column whose header literally contains `#N` wins over the
        // numbered interpretation.
        if headers.iter().any(|h| h == name) {
            continue;
        }

        if let Some(caps) = NUMBERED_RE.captures(name) {
            let base = caps[1].trim_end().to_string();
            if let Ok(number) = caps[2].parse::<usize>() {
                if headers.iter().any(|h| h == &base) {
                    numbered.entry(base).or_default().push(number);
                    continue;
                }
            }
        }

        missing.push(name.clone());
    }

    if !missing.is_empty() {
        return Err(GenerateError::MissingColumns(missing));
    }

    for (column, mut numbers) in numbered {
        numbers.sort_unstable();
        numbers.dedup();
        let max = match numbers.last() {
            Some(&max) => max,
            None => continue,
        };
        let gaps: Vec<usize> = (1..=max).filter(|n| !numbers.contains(n)).collect();
        if !gaps.is_empty() {
            return Err(GenerateError::PlaceholderNumberingGap {
                column,
                missing: gaps,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(tokens: &[&str]) -> String {
        let runs: String = tokens
            .iter()
            .map(|t| format!("<w:r><w:t>{t}</w:t></w:r>"))
            .collect();
        format!("<w:p>{runs}</w:p>")
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn accepts_template_with_known_columns() {
        let xml = body(&["{Genus}", "{:next}", "{Genus}", "{Locality}"]);
        assert!(validate_template(&xml, &headers(&["Genus", "Locality"])).is_ok());
    }

    #[test]
    fn reports_all_missing_columns_at_once() {
        let xml = body(&["{Genus}", "{Typo}", "{AlsoWrong}"]);
        let err = validate_template(&xml, &headers(&["Genus"])).unwrap_err();
        match err {
            GenerateError::MissingColumns(names) => {
                assert_eq!(names, vec!["Typo", "AlsoWrong"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn control_tags_are_not_validated() {
        let xml = body(&["{#pages}", "{Genus}", "{/pages}"]);
        assert!(validate_template(&xml, &headers(&["Genus"])).is_ok());
    }

    #[test]
    fn accepts_gap_free_numbered_set() {
        let xml = body(&["{Genus#1}", "{Genus#2}", "{Genus#3}"]);
        assert!(validate_template(&xml, &headers(&["Genus"])).is_ok());
    }

    #[test]
    fn reports_numbering_gaps() {
        let xml = body(&["{Genus#1}", "{Genus#4}"]);
        let err = validate_template(&xml, &headers(&["Genus"])).unwrap_err();
        match err {
            GenerateError::PlaceholderNumberingGap { column, missing } => {
                assert_eq!(column, "Genus");
                assert_eq!(missing, vec![2, 3]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numbered_set_must_start_at_one() {
        let xml = body(&["{Genus#2}"]);
        let err = validate_template(&xml, &headers(&["Genus"])).unwrap_err();
        match err {
            GenerateError::PlaceholderNumberingGap { missing, .. } => {
                assert_eq!(missing, vec![1]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exact_header_match_wins_over_numbered_interpretation() {
        let xml = body(&["{Lot#1}"]);
        assert!(validate_template(&xml, &headers(&["Lot#1"])).is_ok());
    }

    #[test]
    fn numbered_token_with_unknown_base_is_a_missing_column() {
        let xml = body(&["{Typo#1}"]);
        let err = validate_template(&xml, &headers(&["Genus"])).unwrap_err();
        assert!(matches!(err, GenerateError::MissingColumns(names) if names == vec!["Typo#1"]));
    }
}
