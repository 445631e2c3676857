//! Cell values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// ISO-8601 calendar date format used for textual dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single cell value.
///
/// Values are loosely typed: a `Text` cell holding `"42"` still takes part
/// in numeric comparisons through [`CellValue::as_decimal`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    #[default]
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl CellValue {
    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns true for `Null` and for text that is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Returns the textual form of the value. `Null` renders as an empty string.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Integer(i) => Cow::Owned(i.to_string()),
            CellValue::Decimal(d) => Cow::Owned(d.to_string()),
            CellValue::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            CellValue::Date(d) => Cow::Owned(d.format(DATE_FORMAT).to_string()),
        }
    }

    /// Interprets the value as a decimal number.
    ///
    /// Text is trimmed and parsed; non-finite results are rejected.
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Decimal(d) if d.is_finite() => Some(*d),
            CellValue::Text(s) => parse_decimal(s),
            _ => None,
        }
    }

    /// Interprets the value as a calendar date (`Date`, or ISO text).
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Interprets the value as a boolean (`Boolean`, or `true`/`false` text).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Case-insensitive textual equality, used by uniqueness checks.
    pub fn eq_ignore_case(&self, other: &CellValue) -> bool {
        match (self.as_decimal(), other.as_decimal()) {
            (Some(a), Some(b)) => a == b,
            _ => self.as_text().trim().to_lowercase() == other.as_text().trim().to_lowercase(),
        }
    }
}

/// Parses a trimmed decimal literal, rejecting NaN and infinities.
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a trimmed ISO-8601 date.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(i64::from(value))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Decimal(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values() {
        assert!(CellValue::Null.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::from("x").is_blank());
        assert!(!CellValue::Integer(0).is_blank());
    }

    #[test]
    fn test_as_decimal() {
        assert_eq!(CellValue::Integer(17).as_decimal(), Some(17.0));
        assert_eq!(CellValue::from(" 2.5 ").as_decimal(), Some(2.5));
        assert_eq!(CellValue::from("abc").as_decimal(), None);
        assert_eq!(CellValue::from("NaN").as_decimal(), None);
        assert_eq!(CellValue::Decimal(f64::INFINITY).as_decimal(), None);
        assert_eq!(CellValue::Boolean(true).as_decimal(), None);
    }

    #[test]
    fn test_as_text() {
        assert_eq!(CellValue::Null.as_text(), "");
        assert_eq!(CellValue::Decimal(25.0).as_text(), "25");
        assert_eq!(CellValue::Boolean(false).as_text(), "false");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(CellValue::Date(date).as_text(), "2024-02-29");
    }

    #[test]
    fn test_as_date_from_text() {
        let date = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        assert_eq!(CellValue::from("2023-07-01").as_date(), Some(date));
        assert_eq!(CellValue::from("07/01/2023").as_date(), None);
    }

    #[test]
    fn test_eq_ignore_case() {
        assert!(CellValue::from("Ann").eq_ignore_case(&CellValue::from(" ann")));
        assert!(CellValue::from("5").eq_ignore_case(&CellValue::Integer(5)));
        assert!(!CellValue::from("Ann").eq_ignore_case(&CellValue::from("Anne")));
    }

    #[test]
    fn test_serde_round_trip_keeps_variant() {
        let value = CellValue::Integer(3);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":3}"#);
        let back: CellValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
