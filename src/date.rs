//! Calendar-only dates with exactly one textual form.
//!
//! A [`StrictDate`] is either a calendar day or unset. The only accepted and
//! produced text is `YYYY-MM-DD`; anything else parses to the unset state
//! instead of raising an error, so sloppy input degrades quietly.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const FORMAT: &str = "%Y-%m-%d";
const CANONICAL_LEN: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct StrictDate(Option<NaiveDate>);

impl StrictDate {
    /// The unset date.
    pub const fn unset() -> Self {
        StrictDate(None)
    }

    /// Today in the local time zone.
    pub fn today() -> Self {
        StrictDate(Some(Local::now().date_naive()))
    }

    /// Parse `YYYY-MM-DD`. Any other shape, or a day that does not exist on
    /// the calendar, yields the unset date.
    pub fn parse(text: &str) -> Self {
        if !has_canonical_shape(text) {
            return StrictDate(None);
        }
        StrictDate(NaiveDate::parse_from_str(text, FORMAT).ok())
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn naive(&self) -> Option<NaiveDate> {
        self.0
    }

    /// Canonical text, or an empty string when unset.
    pub fn format(&self) -> String {
        match self.0 {
            Some(date) => date.format(FORMAT).to_string(),
            None => String::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.0.map(|d| d.year()).unwrap_or(0)
    }

    pub fn month(&self) -> u32 {
        self.0.map(|d| d.month()).unwrap_or(0)
    }

    pub fn day(&self) -> u32 {
        self.0.map(|d| d.day()).unwrap_or(0)
    }

    pub fn year_str(&self) -> String {
        self.0.map(|d| format!("{:04}", d.year())).unwrap_or_default()
    }

    pub fn month_str(&self) -> String {
        self.0.map(|d| format!("{:02}", d.month())).unwrap_or_default()
    }

    pub fn day_str(&self) -> String {
        self.0.map(|d| format!("{:02}", d.day())).unwrap_or_default()
    }

    /// English weekday name such as "Tuesday", or empty when unset.
    pub fn day_name(&self) -> String {
        self.0
            .map(|d| d.format("%A").to_string())
            .unwrap_or_default()
    }

    /// Order two dates by their canonical text.
    ///
    /// If either side is unset the result is `Equal`. Existing callers rely
    /// on this, so an unset date never sorts before or after anything.
    pub fn compare(&self, other: &StrictDate) -> Ordering {
        if !self.is_valid() || !other.is_valid() {
            return Ordering::Equal;
        }
        self.format().cmp(&other.format())
    }

    pub fn compare_str(&self, other: &str) -> Ordering {
        self.compare(&StrictDate::parse(other))
    }
}

fn has_canonical_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == CANONICAL_LEN
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

impl From<NaiveDate> for StrictDate {
    fn from(date: NaiveDate) -> Self {
        StrictDate(Some(date))
    }
}

impl From<Option<NaiveDate>> for StrictDate {
    fn from(date: Option<NaiveDate>) -> Self {
        StrictDate(date)
    }
}

impl PartialEq for StrictDate {
    fn eq(&self, other: &Self) -> bool {
        self.format() == other.format()
    }
}

impl Eq for StrictDate {}

impl fmt::Display for StrictDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl FromStr for StrictDate {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StrictDate::parse(s))
    }
}

impl Serialize for StrictDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for StrictDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text.map(|t| StrictDate::parse(&t)).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format_roundtrip() {
        for text in ["2024-01-15", "1999-12-31", "2000-02-29", "0001-01-01"] {
            assert_eq!(StrictDate::parse(text).format(), text);
        }
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        for text in [
            "",
            "2024-1-15",
            "2024/01/15",
            "15-01-2024",
            "2024-01-15 ",
            " 2024-01-15",
            "2024-01-15T00:00",
            "20240115",
            "+2024-01-1",
            "abcd-ef-gh",
        ] {
            assert!(!StrictDate::parse(text).is_valid(), "accepted {:?}", text);
        }
    }

    #[test]
    fn test_rejects_impossible_days() {
        assert!(!StrictDate::parse("2023-02-29").is_valid());
        assert!(!StrictDate::parse("2024-13-01").is_valid());
        assert!(!StrictDate::parse("2024-04-31").is_valid());
        assert!(!StrictDate::parse("2024-00-10").is_valid());
    }

    #[test]
    fn test_accessors() {
        let date = StrictDate::parse("2024-03-05");
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 3);
        assert_eq!(date.day(), 5);
        assert_eq!(date.year_str(), "2024");
        assert_eq!(date.month_str(), "03");
        assert_eq!(date.day_str(), "05");
        assert_eq!(date.day_name(), "Tuesday");
    }

    #[test]
    fn test_unset_accessors() {
        let date = StrictDate::unset();
        assert_eq!(date.year(), 0);
        assert_eq!(date.month(), 0);
        assert_eq!(date.day(), 0);
        assert_eq!(date.month_str(), "");
        assert_eq!(date.day_str(), "");
        assert_eq!(date.day_name(), "");
        assert_eq!(date.format(), "");
    }

    #[test]
    fn test_compare() {
        let a = StrictDate::parse("2024-01-15");
        let b = StrictDate::parse("2024-02-01");
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a), Ordering::Equal);
        assert_eq!(a.compare_str("2023-12-31"), Ordering::Greater);
    }

    #[test]
    fn test_compare_with_unset_is_equal() {
        let a = StrictDate::parse("2024-01-15");
        let unset = StrictDate::unset();
        assert_eq!(a.compare(&unset), Ordering::Equal);
        assert_eq!(unset.compare(&a), Ordering::Equal);
        assert_eq!(unset.compare(&unset), Ordering::Equal);
        // compare says Equal, but equality is on the text
        assert_ne!(a, unset);
        assert_eq!(unset, StrictDate::parse("garbage"));
    }

    #[test]
    fn test_clear_and_copy() {
        let mut date = StrictDate::parse("2024-01-15");
        let copy = date;
        date.clear();
        assert!(!date.is_valid());
        assert!(copy.is_valid());
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let date = StrictDate::parse("2024-01-15");
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-01-15\"");
        assert_eq!(serde_json::to_string(&StrictDate::unset()).unwrap(), "\"\"");

        let parsed: StrictDate = serde_json::from_str("\"2024-01-15\"").unwrap();
        assert_eq!(parsed, date);
        let bad: StrictDate = serde_json::from_str("\"01/15/2024\"").unwrap();
        assert!(!bad.is_valid());
        let null: StrictDate = serde_json::from_str("null").unwrap();
        assert!(!null.is_valid());
    }
}
