//! Formatting Engine – pure value transformers applied between filtering and
//! duplicate expansion: locale-aware date reformatting, decimal-separator
//! normalization, and geocoordinate re-encoding.
//!
//! Every transformer passes unparseable input through unchanged; formatting
//! never fails a generation run.

use std::sync::LazyLock;

use chrono::format::Locale;
use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

use crate::config::{DateMode, DateStyle, DecimalSeparator, Formatting, GeocoordMode};
use crate::geo;
use crate::record::{CellHint, CellValue, Row};

/// Spreadsheet serial day 0 (the 1900 date system's phantom epoch).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

const ROMAN_MONTHS: [&str; 12] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
];

/// Month-first locales; everything else reads delimited dates day-first.
const MONTH_FIRST_LOCALES: [&str; 2] = ["en-US", "en-PH"];

static DELIMITED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4})$")
        .expect("BUG: invalid DELIMITED_DATE_RE regex literal")
});

static ISO_LIKE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}[/\-.]\d{1,2}[/\-.]\d{1,2}$")
        .expect("BUG: invalid ISO_LIKE_DATE_RE regex literal")
});

static DECIMAL_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d+[.,]\d+$").expect("BUG: invalid DECIMAL_VALUE_RE regex literal")
});

static MONTH_NAME_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec))|^((jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+\d{1,2})",
    )
    .expect("BUG: invalid MONTH_NAME_DATE_RE regex literal")
});

/// Free-form formats tried after the ambiguous-delimited path fails.
const FREEFORM_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn is_day_first(locale: &str) -> bool {
    !MONTH_FIRST_LOCALES.iter().any(|mf| locale.starts_with(mf))
}

fn chrono_locale(locale: &str) -> Locale {
    let normalized = locale.trim().replace('-', "_");
    Locale::try_from(normalized.as_str()).unwrap_or(Locale::en_US)
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(serial > 1.0 && serial < 100_000.0) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

fn expand_two_digit_year(raw: &str) -> i32 {
    let n: i32 = raw.parse().unwrap_or(0);
    if raw.len() == 2 {
        2000 + n
    } else {
        n
    }
}

/// Parse a cell into a calendar date.
///
/// Accepts spreadsheet serials, slash/dash/dot-delimited ambiguous dates
/// (day-first vs month-first per locale, retrying the opposite order when the
/// first reading is not a valid calendar date), and free-form strings.
pub fn parse_date(value: &str, locale: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        return serial_to_date(serial);
    }

    if let Some(caps) = DELIMITED_DATE_RE.captures(trimmed) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        let year = expand_two_digit_year(&caps[3]);

        let (day, month) = if is_day_first(locale) { (a, b) } else { (b, a) };
        return NaiveDate::from_ymd_opt(year, month, day)
            // Invalid under the locale's reading – retry the other order.
            .or_else(|| NaiveDate::from_ymd_opt(year, day, month));
    }

    FREEFORM_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Reformat a date cell per the configured style; unparseable input passes
/// through unchanged.
pub fn format_date(value: &str, style: DateStyle, locale: &str) -> String {
    let date = match parse_date(value, locale) {
        Some(d) => d,
        None => {
            if !value.trim().is_empty() {
                log::debug!("unparseable date cell left as-is: {value:?}");
            }
            return value.to_string();
        }
    };

    let loc = chrono_locale(locale);
    let day = date.day();
    let year = date.year();
    let month_index = (date.month0()) as usize;

    match style {
        DateStyle::Roman => format!("{day:02}-{}-{year}", ROMAN_MONTHS[month_index]),
        DateStyle::Iso => format!("{year}-{:02}-{day:02}", date.month()),
        DateStyle::English => {
            format!("{} {day:02}, {year}", date.format_localized("%B", loc))
        }
        DateStyle::Short => {
            format!("{} {day:02}, {year}", date.format_localized("%b", loc))
        }
        DateStyle::ThreeLetter => format!(
            "{day:02} {} {year}",
            date.format_localized("%b", loc).to_string().to_uppercase()
        ),
    }
}

/// Does this cell look like a date? A spreadsheet cell hint wins over the
/// pattern heuristics.
pub fn is_likely_date(value: &str, hint: Option<&CellHint>, locale: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }

    if hint.is_some_and(|h| h.is_date) {
        return true;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return match trimmed.parse::<i64>() {
            // Small integers are counts, not serials.
            Ok(n) => n >= 1_000 && n < 100_000,
            Err(_) => false,
        };
    }

    if DELIMITED_DATE_RE.is_match(trimmed)
        || ISO_LIKE_DATE_RE.is_match(trimmed)
        || MONTH_NAME_DATE_RE.is_match(trimmed)
    {
        return true;
    }

    match parse_date(trimmed, locale) {
        Some(date) => (1800..=2100).contains(&date.year()),
        None => false,
    }
}

/// Strict decimal check: digits, one separator, digits – and not date-like.
pub fn is_likely_decimal(value: &str) -> bool {
    let trimmed = value.trim();
    if DELIMITED_DATE_RE.is_match(trimmed) || ISO_LIKE_DATE_RE.is_match(trimmed) {
        return false;
    }
    DECIMAL_VALUE_RE.is_match(trimmed)
}

/// Normalize the decimal separator of a numeric cell.
pub fn format_decimal(value: &str, separator: DecimalSeparator) -> String {
    let parsed: f64 = match value.trim().replace(',', ".").parse() {
        Ok(n) => n,
        Err(_) => return value.to_string(),
    };
    let canonical = if parsed.fract() == 0.0 && parsed.abs() < 1e15 {
        format!("{}", parsed as i64)
    } else {
        parsed.to_string()
    };
    match separator {
        DecimalSeparator::Dot => canonical,
        DecimalSeparator::Comma => canonical.replace('.', ","),
    }
}

fn format_geocoord_cell(
    value: &str,
    column: &str,
    formatting: &Formatting,
) -> Option<String> {
    let geocoord = &formatting.geocoord;
    let separator = formatting.decimal_format;

    match geocoord.mode {
        GeocoordMode::None => None,
        GeocoordMode::Single => {
            if geocoord.single_column.as_deref() != Some(column)
                || !geo::is_likely_geocoordinate(value)
            {
                return None;
            }
            // One cell holding "lat lon", whitespace- or comma-separated.
            let parts: Vec<&str> = value
                .trim()
                .split([' ', '\t', ','])
                .filter(|p| !p.trim().is_empty())
                .collect();
            if parts.len() != 2 {
                return None;
            }
            let lat = geo::parse_coordinate(parts[0])?;
            let lon = geo::parse_coordinate(parts[1])?;
            Some(format!(
                "{} {}",
                geo::encode_coordinate(lat, geocoord.output_format, true, separator),
                geo::encode_coordinate(lon, geocoord.output_format, false, separator),
            ))
        }
        GeocoordMode::Separate => {
            let is_lat = geocoord.lat_column.as_deref() == Some(column);
            let is_lon = geocoord.lon_column.as_deref() == Some(column);
            if !is_lat && !is_lon {
                return None;
            }
            let parsed = geo::parse_coordinate(value)?;
            Some(geo::encode_coordinate(
                parsed,
                geocoord.output_format,
                is_lat,
                separator,
            ))
        }
    }
}

fn format_cell(value: &CellValue, column: &str, hint: Option<&CellHint>, formatting: &Formatting) -> CellValue {
    if value.is_blank() {
        return value.clone();
    }
    let text = value.to_text();
    let date = &formatting.date;
    let is_date_column = date.mode == DateMode::Column && date.columns.iter().any(|c| c == column);

    // Gate on the likelihood check so small counts sharing a date column do
    // not get read as spreadsheet serials.
    let mut out = if is_date_column && is_likely_date(&text, hint, &date.locale) {
        format_date(&text, date.format, &date.locale)
    } else {
        text
    };

    // Decimal normalization never touches date columns or date-hinted cells.
    if !is_date_column
        && !hint.is_some_and(|h| h.is_date)
        && is_likely_decimal(&out)
    {
        out = format_decimal(&out, formatting.decimal_format);
    }

    if let Some(geo_formatted) = format_geocoord_cell(&out, column, formatting) {
        out = geo_formatted;
    }

    if out.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(out)
    }
}

/// Apply all configured value formatting. Copy-on-write: returns fresh rows,
/// metadata carried over untouched.
pub fn apply_formatting(rows: &[Row], formatting: &Formatting) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            let mut record = row.record.clone();
            for column in row.record.columns().map(str::to_string).collect::<Vec<_>>() {
                if formatting.skip_columns.iter().any(|s| s == &column) {
                    continue;
                }
                let value = row.record.get(&column).cloned().unwrap_or_default();
                let hint = row.meta.hint(&column);
                record.set(&column, format_cell(&value, &column, hint, formatting));
            }
            Row {
                record,
                meta: row.meta.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DateFormatting, Geocoord, GeocoordFormat};
    use crate::record::Record;

    #[test]
    fn serial_dates_convert() {
        // 45292 = 2024-01-01 in the 1900 date system.
        let d = parse_date("45292", "en-US").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        // Tiny and huge numbers are not serials.
        assert!(parse_date("1", "en-US").is_none());
        assert!(parse_date("123456789", "en-US").is_none());
    }

    #[test]
    fn ambiguous_dates_follow_locale() {
        // 03/04/2024: April 3rd day-first, March 4th month-first.
        let day_first = parse_date("03/04/2024", "cs-CZ").unwrap();
        assert_eq!(day_first, NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
        let month_first = parse_date("03/04/2024", "en-US").unwrap();
        assert_eq!(month_first, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_ne!(
            format_date("03/04/2024", DateStyle::Iso, "cs-CZ"),
            format_date("03/04/2024", DateStyle::Iso, "en-US")
        );
    }

    #[test]
    fn invalid_reading_retries_opposite_order() {
        // 25/12/2024 has no month 25 – a month-first locale must fall back to
        // day-first to get a valid calendar date.
        let d = parse_date("25/12/2024", "en-US").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
    }

    #[test]
    fn two_digit_years_are_2000s() {
        let d = parse_date("5/6/24", "en-GB").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 6, 5).unwrap());
    }

    #[test]
    fn freeform_dates_parse() {
        assert_eq!(
            parse_date("2024-01-15", "en-US").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("January 15, 2024", "en-US").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("15 Jan 2024", "en-US").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn date_output_styles() {
        let v = "2024-03-07";
        assert_eq!(format_date(v, DateStyle::Roman, "en-US"), "07-III-2024");
        assert_eq!(format_date(v, DateStyle::Iso, "en-US"), "2024-03-07");
        assert_eq!(format_date(v, DateStyle::English, "en-US"), "March 07, 2024");
        assert_eq!(format_date(v, DateStyle::Short, "en-US"), "Mar 07, 2024");
        assert_eq!(
            format_date(v, DateStyle::ThreeLetter, "en-US"),
            "07 MAR 2024"
        );
    }

    #[test]
    fn unparseable_dates_pass_through() {
        assert_eq!(format_date("not a date", DateStyle::Iso, "en-US"), "not a date");
        assert_eq!(format_date("", DateStyle::Iso, "en-US"), "");
    }

    #[test]
    fn decimal_detection_excludes_dates() {
        assert!(is_likely_decimal("3.14"));
        assert!(is_likely_decimal("-2,5"));
        assert!(!is_likely_decimal("3.4.2024"));
        assert!(!is_likely_decimal("2024-01-01"));
        assert!(!is_likely_decimal("42"));
        assert!(!is_likely_decimal("1.2.3"));
    }

    #[test]
    fn decimal_separator_normalizes_both_ways() {
        assert_eq!(format_decimal("3,5", DecimalSeparator::Dot), "3.5");
        assert_eq!(format_decimal("3.5", DecimalSeparator::Comma), "3,5");
        assert_eq!(format_decimal("3.50", DecimalSeparator::Dot), "3.5");
        assert_eq!(format_decimal("junk", DecimalSeparator::Comma), "junk");
    }

    #[test]
    fn date_likelihood_uses_hints_first() {
        let hint = CellHint {
            is_date: true,
            number_format: None,
        };
        assert!(is_likely_date("45292", Some(&hint), "en-US"));
        assert!(is_likely_date("12/05/2023", None, "en-US"));
        assert!(!is_likely_date("12", None, "en-US"));
        assert!(!is_likely_date("Carex", None, "en-US"));
    }

    fn rows_of(pairs: &[(&str, &str)]) -> Vec<Row> {
        let mut record = Record::new();
        for (k, v) in pairs {
            record.insert(*k, *v);
        }
        vec![Row::new(record)]
    }

    #[test]
    fn formatting_respects_skip_list() {
        let mut formatting = Formatting::default();
        formatting.skip_columns = vec!["Altitude".into()];
        formatting.decimal_format = DecimalSeparator::Comma;
        let rows = rows_of(&[("Altitude", "12.5"), ("Weight", "12.5")]);
        let out = apply_formatting(&rows, &formatting);
        assert_eq!(out[0].record.text("Altitude"), "12.5");
        assert_eq!(out[0].record.text("Weight"), "12,5");
    }

    #[test]
    fn date_columns_exempt_from_decimal_pass() {
        let mut formatting = Formatting::default();
        formatting.date = DateFormatting {
            mode: DateMode::Column,
            columns: vec!["Collected".into()],
            format: DateStyle::Iso,
            locale: "en-GB".into(),
        };
        formatting.decimal_format = DecimalSeparator::Comma;
        let rows = rows_of(&[("Collected", "03/04/2024")]);
        let out = apply_formatting(&rows, &formatting);
        assert_eq!(out[0].record.text("Collected"), "2024-04-03");
    }

    #[test]
    fn date_columns_leave_unlikely_cells_alone() {
        let mut formatting = Formatting::default();
        formatting.date = DateFormatting {
            mode: DateMode::Column,
            columns: vec!["Collected".into()],
            format: DateStyle::Roman,
            locale: "en-US".into(),
        };
        // "150" parses as a valid serial but does not look like a date, so it
        // stays a count. A cell hint overrides the heuristics.
        let rows = rows_of(&[("Collected", "150")]);
        let out = apply_formatting(&rows, &formatting);
        assert_eq!(out[0].record.text("Collected"), "150");

        let mut hinted = rows_of(&[("Collected", "150")]);
        hinted[0].meta.hints.insert(
            "Collected".into(),
            CellHint {
                is_date: true,
                number_format: None,
            },
        );
        let out = apply_formatting(&hinted, &formatting);
        assert_eq!(out[0].record.text("Collected"), "29-V-1900");
    }

    #[test]
    fn single_column_geocoord_pair() {
        let mut formatting = Formatting::default();
        formatting.geocoord = Geocoord {
            mode: GeocoordMode::Single,
            single_column: Some("Coordinates".into()),
            lat_column: None,
            lon_column: None,
            output_format: GeocoordFormat::Dms,
        };
        let rows = rows_of(&[("Coordinates", "12.5 -101.25")]);
        let out = apply_formatting(&rows, &formatting);
        assert_eq!(out[0].record.text("Coordinates"), r#"12°30'0.0"N 101°15'0.0"W"#);
    }

    #[test]
    fn separate_geocoord_columns() {
        let mut formatting = Formatting::default();
        formatting.geocoord = Geocoord {
            mode: GeocoordMode::Separate,
            single_column: None,
            lat_column: Some("Lat".into()),
            lon_column: Some("Lon".into()),
            output_format: GeocoordFormat::DecimalSigned,
        };
        let rows = rows_of(&[("Lat", r#"12°30'0.0"S"#), ("Lon", "101.25"), ("Genus", "Carex")]);
        let out = apply_formatting(&rows, &formatting);
        assert_eq!(out[0].record.text("Lat"), "-12.500000");
        assert_eq!(out[0].record.text("Lon"), "101.250000");
        assert_eq!(out[0].record.text("Genus"), "Carex");
    }
}
