//! Lenient date and number parsing for client input.
//!
//! Clients send either a calendar date (`2024-03-01`) or a full RFC 3339 timestamp.
//! Form-style clients send numbers as strings (`"120"`).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD` date (taken as midnight UTC)
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Parse a `YYYY-MM-DD` date, or the date part of an RFC 3339 timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn flexible_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
}

pub fn optional_flexible_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw))),
        None => Ok(None),
    }
}

pub fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw))),
        None => Ok(None),
    }
}

/// Parse a JSON number or a numeric string. Blank strings and null are absent.
fn lenient_number<E: de::Error>(value: Option<Value>) -> Result<Option<f64>, E> {
    let number = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(other) => return Err(E::custom(format!("expected a number, found {}", other))),
    };
    match number {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(E::custom("invalid number")),
    }
}

pub fn optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_number(Option::<Value>::deserialize(deserializer)?)
}

/// Like [`optional_f64`], dropping any fractional part
pub fn optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number::<D::Error>(Option::<Value>::deserialize(deserializer)?)?.map(|n| n.trunc() as i64))
}

/// Whole years between `dob` and `today`
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i64 {
    use chrono::Datelike;

    let mut years = i64::from(today.year() - dob.year());
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_accepts_both_forms() {
        let date_only = parse_datetime("2024-03-01").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let full = parse_datetime("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(full.to_rfc3339(), "2024-03-01T08:30:00+00:00");

        assert!(parse_datetime("next tuesday").is_none());
    }

    #[test]
    fn test_parse_date_from_timestamp() {
        assert_eq!(
            parse_date("1990-05-17T00:00:00Z"),
            NaiveDate::from_ymd_opt(1990, 5, 17)
        );
        assert!(parse_date("17/05/1990").is_none());
    }

    #[derive(Debug, Deserialize)]
    struct Vitals {
        #[serde(default, deserialize_with = "optional_f64")]
        pressure: Option<f64>,
        #[serde(default, deserialize_with = "optional_i64")]
        age: Option<i64>,
    }

    fn vitals(value: serde_json::Value) -> Result<Vitals, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn test_numbers_accept_numeric_strings() {
        let parsed = vitals(serde_json::json!({"pressure": "120.5", "age": " 34 "})).unwrap();
        assert_eq!(parsed.pressure, Some(120.5));
        assert_eq!(parsed.age, Some(34));

        let parsed = vitals(serde_json::json!({"pressure": 118, "age": 41.9})).unwrap();
        assert_eq!(parsed.pressure, Some(118.0));
        assert_eq!(parsed.age, Some(41));

        let parsed = vitals(serde_json::json!({"pressure": "", "age": null})).unwrap();
        assert_eq!(parsed.pressure, None);
        assert_eq!(parsed.age, None);
    }

    #[test]
    fn test_numbers_reject_non_numeric_input() {
        assert!(vitals(serde_json::json!({"pressure": "high"})).is_err());
        assert!(vitals(serde_json::json!({"pressure": "NaN"})).is_err());
        assert!(vitals(serde_json::json!({"age": [34]})).is_err());
        assert!(vitals(serde_json::json!({"age": true})).is_err());
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(1990, 5, 17).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 5, 16).unwrap()), 33);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()), 34);
    }
}
