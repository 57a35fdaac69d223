//! Wire codecs shared by the remote payloads and the persisted layouts.
//!
//! - Timestamps are ISO-8601 in UTC with millisecond precision, e.g. `2025-06-11T16:12:34.000Z`.
//!   Parsing also accepts values without fractional seconds and with explicit offsets.
//! - Query dates are `yyyy-MM-dd` in UTC.
//! - Decimals travel as strings so that no precision is lost to floating point.

use crate::error::Res;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Formats a timestamp the way the backend expects it.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time truncated to the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Parses an ISO-8601 timestamp with or without fractional seconds.
pub fn parse_timestamp(s: &str) -> Res<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid ISO-8601 timestamp '{s}'"))
}

/// Formats the calendar date of `value` (in UTC) for use in a query string.
pub fn format_query_date(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Parses a `yyyy-MM-dd` date.
pub fn parse_query_date(s: &str) -> Res<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{s}', expected yyyy-MM-dd"))
}

/// Parses a decimal written in plain notation, e.g. `-1234.50`.
pub fn parse_decimal(s: &str) -> Res<Decimal> {
    let s = s.trim();
    Decimal::from_str(s).with_context(|| format!("Invalid decimal '{s}'"))
}

/// `#[serde(with = "timestamp")]` for `DateTime<Utc>` fields.
pub(crate) mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
    }
}

/// `#[serde(with = "timestamp_opt")]` for `Option<DateTime<Utc>>` fields.
pub(crate) mod timestamp_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&super::format_timestamp(v)),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::parse_timestamp(&s)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("{e:#}"))),
            None => Ok(None),
        }
    }
}

/// `#[serde(with = "decimal")]` for `Decimal` fields that travel as strings.
pub(crate) mod decimal {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_decimal(&s).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
    }
}
