//! Utility functions for common normalization operations

/// Parse a locale-formatted integer ("1,234,567" -> 1234567).
/// Absent or non-numeric input yields 0, never an error.
pub fn parse_int(raw: &str) -> i64 {
    let cleaned = strip_separators(raw);
    numeric_prefix(&cleaned, false).parse::<i64>().unwrap_or(0)
}

/// Parse a locale-formatted decimal ("84.97", "1,024.5"). Garbage yields 0.0.
pub fn parse_float(raw: &str) -> f64 {
    let cleaned = strip_separators(raw);
    numeric_prefix(&cleaned, true).parse::<f64>().unwrap_or(0.0)
}

fn strip_separators(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != ',').collect()
}

/// Longest leading slice that looks like a number: optional sign, digits,
/// and (when `fraction` is set) one decimal point followed by digits.
fn numeric_prefix(s: &str, fraction: bool) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;

    if fraction && end < bytes.len() && bytes[end] == b'.' {
        let dot = end;
        end += 1;
        let frac_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == frac_start {
            end = dot;
        } else {
            has_digits = true;
        }
    }

    if has_digits {
        &s[..end]
    } else {
        ""
    }
}

/// Build a `YYYY-MM-DD` date from the separate year/month/day fields
/// the MOLIT trade services return
pub fn format_deal_date(year: &str, month: &str, day: &str) -> String {
    format!("{}-{:0>2}-{:0>2}", year.trim(), month.trim(), day.trim())
}

/// Render `YYYYMM` as `YYYY.MM` for chart labels; other shapes pass through
pub fn dotted_month(ym: &str) -> String {
    match (ym.get(..4), ym.get(4..)) {
        (Some(year), Some(month)) if ym.len() == 6 => format!("{}.{}", year, month),
        _ => ym.to_string(),
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Percentage change from `previous` to `current`; 0 when there is no baseline
pub fn pct_change(previous: f64, current: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Rounded mean of integer values, 0 for an empty slice
pub fn mean_rounded(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let sum: i64 = values.iter().sum();
    (sum as f64 / values.len() as f64).round() as i64
}

/// First `max_chars` characters of a body, for error messages
pub fn snippet(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
