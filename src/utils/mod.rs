use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, Utc};
use sha2::{Digest, Sha256};

const MONTHS_FR: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn sha256_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

pub fn parse_decimal(value: &str) -> Result<f64> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| anyhow!("Parse decimal: {}", e))
}

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub fn is_iso_date(value: &str) -> bool {
    parse_iso_date(value).is_some()
}

/// Rewrites common European date spellings to ISO. Unrecognised input is
/// returned trimmed so validation can reject it later.
pub fn normalize_date(value: &str) -> String {
    let raw = value.trim();
    let formats = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y.%m.%d"];
    for fmt in formats.iter() {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

/// Short French display date, e.g. `2021-07-19` becomes `19 Jui. 21`.
pub fn format_date(value: &str) -> String {
    match parse_iso_date(value) {
        Some(date) => format!(
            "{} {}. {:02}",
            date.day(),
            MONTHS_FR[date.month0() as usize],
            date.year().rem_euclid(100)
        ),
        None => value.to_string(),
    }
}

pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{} €", value as i64)
    } else {
        format!("{:.2} €", value)
    }
}

/// Lowercased text after the final `.`, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
