use crate::{EdgarError, Result};
use chrono::NaiveDate;

/// Parses a master index `Date Filed` value (`YYYYMMDD` in daily files, `YYYY-MM-DD` in
/// quarterly ones).
pub fn parse_index_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| EdgarError::parse(format!("invalid filing date: {}", s)))
}

/// Parses the `MM-DD-YYYY` dates used throughout the 13F primary document.
pub fn parse_form_date(field: &str, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%m-%d-%Y")
        .map_err(|_| EdgarError::parse(format!("invalid {} date: {}", field, s)))
}

/// Parses a numeric field, tolerating thousands separators.
pub fn parse_f64(field: &str, s: &str) -> Result<f64> {
    s.trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| EdgarError::parse(format!("invalid number in {}: {}", field, s)))
}

pub fn parse_i64(field: &str, s: &str) -> Result<i64> {
    s.trim()
        .replace(',', "")
        .parse::<i64>()
        .map_err(|_| EdgarError::parse(format!("invalid integer in {}: {}", field, s)))
}

/// Concatenates key components and strips every `-`.
///
/// Not injective: `("1-2", "3")` and `("12", "3")` collide.
pub fn composite_key(parts: &[&str]) -> String {
    parts.concat().replace('-', "")
}
