//! Geocoordinate parsing and encoding.
//!
//! Accepts degree-minute-second notation (`12°34'56.7"N`), directional
//! decimal (`12.345 N`), and signed decimal (comma or dot separator); encodes
//! back to DMS-with-direction, decimal-with-direction, or signed decimal.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{DecimalSeparator, GeocoordFormat};

static DMS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(-?\d+)[°\s]+(\d+)['\s]+(\d+(?:\.\d+)?)["\s]*([NSEW])?"#)
        .expect("BUG: invalid DMS_RE regex literal")
});

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(-?\d+(?:\.\d+)?)\s*([NSEW])?$")
        .expect("BUG: invalid DECIMAL_RE regex literal")
});

/// Parse a DMS string into signed decimal degrees.
pub fn parse_dms(input: &str) -> Option<f64> {
    let caps = DMS_RE.captures(input)?;
    let degrees: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;

    let mut decimal = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    if degrees < 0.0 {
        decimal = -decimal;
    }
    if let Some(dir) = caps.get(4) {
        if matches!(dir.as_str().to_ascii_uppercase().as_str(), "S" | "W") {
            decimal = -decimal.abs();
        }
    }
    Some(decimal)
}

/// Parse a decimal-degree string, with an optional trailing direction letter
/// and either decimal separator.
pub fn parse_decimal(input: &str) -> Option<f64> {
    let normalized = input.trim().replace(',', ".");
    let caps = match DECIMAL_RE.captures(&normalized) {
        Some(c) => c,
        None => return normalized.parse::<f64>().ok(),
    };
    let mut decimal: f64 = caps.get(1)?.as_str().parse().ok()?;
    if let Some(dir) = caps.get(2) {
        if matches!(dir.as_str().to_ascii_uppercase().as_str(), "S" | "W") {
            decimal = -decimal.abs();
        }
    }
    Some(decimal)
}

/// Parse a coordinate in any supported notation.
pub fn parse_coordinate(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('°') || trimmed.contains('\'') || trimmed.contains('"') {
        if let Some(dms) = parse_dms(trimmed) {
            return Some(dms);
        }
    }
    parse_decimal(trimmed)
}

fn direction_letter(decimal: f64, is_latitude: bool) -> char {
    match (is_latitude, decimal >= 0.0) {
        (true, true) => 'N',
        (true, false) => 'S',
        (false, true) => 'E',
        (false, false) => 'W',
    }
}

fn apply_separator(value: String, separator: DecimalSeparator) -> String {
    match separator {
        DecimalSeparator::Dot => value,
        DecimalSeparator::Comma => value.replace('.', ","),
    }
}

/// Encode as `D°M'S.s"X`, seconds to one decimal place.
pub fn encode_dms(decimal: f64, is_latitude: bool, separator: DecimalSeparator) -> String {
    let abs = decimal.abs();
    let degrees = abs.floor();
    let minutes_float = (abs - degrees) * 60.0;
    let minutes = minutes_float.floor();
    let seconds = apply_separator(
        format!("{:.1}", (minutes_float - minutes) * 60.0),
        separator,
    );
    let dir = direction_letter(decimal, is_latitude);
    format!("{}°{}'{}\"{}", degrees as i64, minutes as i64, seconds, dir)
}

/// Encode as an unsigned 6-decimal value followed by the direction letter.
pub fn encode_decimal_direction(
    decimal: f64,
    is_latitude: bool,
    separator: DecimalSeparator,
) -> String {
    let value = apply_separator(format!("{:.6}", decimal.abs()), separator);
    format!("{}{}", value, direction_letter(decimal, is_latitude))
}

/// Encode as a signed 6-decimal value.
pub fn encode_signed_decimal(decimal: f64, separator: DecimalSeparator) -> String {
    apply_separator(format!("{decimal:.6}"), separator)
}

/// Encode per the configured output format.
pub fn encode_coordinate(
    decimal: f64,
    format: GeocoordFormat,
    is_latitude: bool,
    separator: DecimalSeparator,
) -> String {
    match format {
        GeocoordFormat::Dms => encode_dms(decimal, is_latitude, separator),
        GeocoordFormat::DecimalDirection => {
            encode_decimal_direction(decimal, is_latitude, separator)
        }
        GeocoordFormat::DecimalSigned => encode_signed_decimal(decimal, separator),
    }
}

/// Heuristic: does this cell look like a coordinate or a lat/lon pair?
pub fn is_likely_geocoordinate(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return false;
    }

    if trimmed.contains('°') || trimmed.contains('\'') || trimmed.contains('"') {
        return parse_dms(trimmed).is_some();
    }

    if let Ok(decimal) = trimmed.replace(',', ".").parse::<f64>() {
        return (-180.0..=180.0).contains(&decimal);
    }

    // Lat/lon pair in one cell, separated by whitespace.
    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    if parts.len() == 2 {
        let lat = parts[0].replace(',', ".").parse::<f64>();
        let lon = parts[1].replace(',', ".").parse::<f64>();
        if let (Ok(lat), Ok(lon)) = (lat, lon) {
            return (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
        }
    }

    false
}
