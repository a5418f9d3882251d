use chrono::{Month, NaiveDate};

/// Largest QR count accepted for a single row. Keeps per-group sums far below `u64::MAX`.
pub const MAX_QR_COUNT: u64 = u32::MAX as u64;

/// English month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
}

/// Parses a date cell. Blank or malformed text yields `None`.
pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, format).ok()
}

/// Parses a numeric cell with `.` as the decimal separator. Non-finite values count as missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a QR count: a whole number between 0 and `MAX_QR_COUNT`, written either as `5` or `5.0`.
pub fn parse_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(count) = trimmed.parse::<u64>() {
        return (count <= MAX_QR_COUNT).then_some(count);
    }

    let value = parse_number(trimmed)?;
    if value < 0.0 || value.fract() != 0.0 || value > MAX_QR_COUNT as f64 {
        return None;
    }
    Some(value as u64)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
