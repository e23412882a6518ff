//! Field normalizers.
//!
//! Pure functions converting the heterogeneous date and amount
//! representations found in bank exports into canonical values. Both
//! normalizers are deterministic for identical input and have no side
//! effects; failures are row-level and recoverable.

use crate::error::{Error, Result};
use crate::reader::Cell;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Text date formats tried in priority order.
static DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];

/// Best-effort fallback for timestamp-like strings; only the date part is
/// kept.
static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

/// Currency tokens stripped before amount parsing.
static CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '₹'];
static CURRENCY_WORDS: &[&str] = &["EUR", "Eur", "eur", "Rs", "RS", "rs"];

/// Spreadsheet serial-date epoch (1899-12-30, accounting for the 1900 leap
/// year bug).
fn serial_date_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

/// Normalize a raw cell into a calendar date.
///
/// Numeric cells are interpreted as spreadsheet serial dates. Text cells are
/// tried against [`DATE_FORMATS`] in order, then against the timestamp
/// fallbacks.
///
/// # Errors
///
/// `InvalidDate` when the cell is empty or no representation matches.
pub fn normalize_date(value: &Cell) -> Result<NaiveDate> {
    match value {
        Cell::Number(serial) => parse_serial_date(*serial),
        Cell::Text(s) => parse_text_date(s),
        Cell::Empty => Err(Error::InvalidDate("empty date value".to_string())),
        Cell::Bool(b) => Err(Error::InvalidDate(b.to_string())),
    }
}

fn parse_serial_date(serial: f64) -> Result<NaiveDate> {
    if !(1.0..100_000.0).contains(&serial) {
        return Err(Error::InvalidDate(serial.to_string()));
    }
    let days = serial.floor() as i64;
    serial_date_epoch()
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| Error::InvalidDate(serial.to_string()))
}

fn parse_text_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDate("empty date value".to_string()));
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }

    // Serial dates sometimes arrive as text, e.g. from re-exported sheets.
    if let Ok(serial) = trimmed.parse::<f64>() {
        return parse_serial_date(serial);
    }

    Err(Error::InvalidDate(trimmed.to_string()))
}

/// Normalize a raw cell into a signed decimal amount.
///
/// Text amounts are stripped of whitespace and currency tokens; the decimal
/// separator is disambiguated before parsing (when both `.` and `,` appear,
/// the one occurring last is the decimal separator).
///
/// # Errors
///
/// `InvalidAmount` when the cell is empty or the text does not parse.
pub fn normalize_amount(value: &Cell) -> Result<Decimal> {
    match value {
        Cell::Number(n) => {
            Decimal::from_f64(*n).ok_or_else(|| Error::InvalidAmount(n.to_string()))
        }
        Cell::Text(s) => parse_text_amount(s),
        Cell::Empty => Err(Error::InvalidAmount("empty amount value".to_string())),
        Cell::Bool(b) => Err(Error::InvalidAmount(b.to_string())),
    }
}

/// Variant of [`normalize_amount`] for the two-column debit/credit layouts
/// where a blank cell means zero contribution.
pub fn normalize_optional_amount(value: &Cell) -> Result<Option<Decimal>> {
    if value.is_blank() {
        return Ok(None);
    }
    normalize_amount(value).map(Some)
}

fn parse_text_amount(s: &str) -> Result<Decimal> {
    let mut cleaned = s.trim().to_string();
    if cleaned.is_empty() {
        return Err(Error::InvalidAmount("empty amount value".to_string()));
    }

    for word in CURRENCY_WORDS {
        cleaned = cleaned.replace(word, "");
    }
    cleaned.retain(|c| !CURRENCY_SYMBOLS.contains(&c) && !c.is_whitespace());

    let cleaned = disambiguate_separators(&cleaned);

    Decimal::from_str(&cleaned).map_err(|_| Error::InvalidAmount(s.trim().to_string()))
}

fn disambiguate_separators(s: &str) -> String {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => {
            // European style: dots group thousands, comma is decimal.
            s.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => {
            // Anglophone style: commas group thousands.
            s.replace(',', "")
        }
        (Some(_), None) => {
            if s.matches(',').count() > 1 {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_date_formats_round_trip() {
        // Day 25 keeps every pattern unambiguous under the fixed priority.
        let date = NaiveDate::from_ymd_opt(2024, 4, 25).unwrap();
        for format in DATE_FORMATS {
            let rendered = date.format(format).to_string();
            assert_eq!(normalize_date(&text(&rendered)).unwrap(), date, "{}", format);
        }
    }

    #[test]
    fn test_date_priority_prefers_day_first() {
        // 03/04/2024 resolves as 3 April, not 4 March.
        let date = normalize_date(&text("03/04/2024")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
    }

    #[test]
    fn test_serial_date() {
        let date = normalize_date(&Cell::Number(45292.0)).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_datetime_fallback() {
        let date = normalize_date(&text("2024-05-06 13:45:00")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
    }

    #[test]
    fn test_invalid_dates() {
        assert!(matches!(
            normalize_date(&Cell::Empty),
            Err(Error::InvalidDate(_))
        ));
        assert!(matches!(
            normalize_date(&text("not a date")),
            Err(Error::InvalidDate(_))
        ));
        assert!(matches!(
            normalize_date(&text("  ")),
            Err(Error::InvalidDate(_))
        ));
    }

    #[test]
    fn test_amount_currency_and_separator_variants() {
        let expected = Decimal::from_str("1234.56").unwrap();
        for raw in [
            "1234.56",
            "1,234.56",
            "€ 1.234,56",
            "$1,234.56",
            "1 234,56",
            "EUR 1234,56",
            "1234.56 Rs",
        ] {
            assert_eq!(normalize_amount(&text(raw)).unwrap(), expected, "{}", raw);
        }
    }

    #[test]
    fn test_amount_negative_and_numeric() {
        assert_eq!(
            normalize_amount(&text("-45,00")).unwrap(),
            Decimal::from_str("-45.00").unwrap()
        );
        assert_eq!(
            normalize_amount(&Cell::Number(-12.5)).unwrap(),
            Decimal::from_str("-12.5").unwrap()
        );
    }

    #[test]
    fn test_optional_amount_blank_is_none() {
        assert_eq!(normalize_optional_amount(&Cell::Empty).unwrap(), None);
        assert_eq!(normalize_optional_amount(&text("   ")).unwrap(), None);
        assert_eq!(
            normalize_optional_amount(&text("10,00")).unwrap(),
            Some(Decimal::from_str("10.00").unwrap())
        );
    }

    #[test]
    fn test_invalid_amounts() {
        assert!(matches!(
            normalize_amount(&Cell::Empty),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            normalize_amount(&text("abc")),
            Err(Error::InvalidAmount(_))
        ));
    }
}
