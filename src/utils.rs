use chrono::NaiveDateTime;

/// Parse a float that may use comma as decimal separator
pub fn parse_locale_float(s: &str) -> Result<f64, std::num::ParseFloatError> {
    s.trim().replace(',', ".").parse::<f64>()
}

/// Round for display. Stored values stay unrounded.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub fn round3_opt(value: Option<f64>) -> Option<f64> {
    value.map(round3)
}

const INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse an instant typed by a user (ISO order, optional seconds).
pub fn parse_instant(text: &str) -> Result<NaiveDateTime, String> {
    let trimmed = text.trim();
    INSTANT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("Failed to parse instant '{}', expected YYYY-MM-DD HH:MM[:SS]", text))
}

/// Canonical text form used for labels and exports.
pub fn format_instant(instant: &NaiveDateTime) -> String {
    instant.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}
