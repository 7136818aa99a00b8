use std::str::FromStr;

use chrono::{
    naive::{NaiveDate, NaiveDateTime, NaiveTime},
    DateTime, Duration, Local, TimeZone, Utc,
};

use crate::errors::{SnowflakeError, SnowflakeResult};

/// The column type Snowflake reports in the result metadata
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawCell {
    Fixed,
    Real,
    Text,
    Binary,
    Boolean,
    Date,
    Time,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,
}

impl RawCell {
    pub fn name(&self) -> &'static str {
        match self {
            RawCell::Fixed => "fixed",
            RawCell::Real => "real",
            RawCell::Text => "text",
            RawCell::Binary => "binary",
            RawCell::Boolean => "boolean",
            RawCell::Date => "date",
            RawCell::Time => "time",
            RawCell::TimestampLtz => "timestamp_ltz",
            RawCell::TimestampNtz => "timestamp_ntz",
            RawCell::TimestampTz => "timestamp_tz",
        }
    }

    /// Convert a value in Snowflake's string wire form into a Cell.
    ///
    /// - Decimals are not supported. Number type columns are converted to i128 if possible,
    ///   otherwise f64. So there can be a loss of precision, which is a tradeoff for convenience.
    /// - For the same reason, NUMBER columns can contain mixed types: Int and Float
    pub fn to_cell(&self, value: &Option<String>) -> SnowflakeResult<Cell> {
        let value = match value {
            Some(value) => value.as_str(),
            None => return Ok(Cell::Null),
        };
        let invalid = || SnowflakeError::CellParse {
            column_type: self.name(),
            value: value.to_owned(),
        };
        let cell = match self {
            RawCell::Fixed => match value.trim_end_matches(".0").parse() {
                Ok(value) => Cell::Int(value),
                Err(_) => Cell::Float(self.parse(value)?),
            },
            RawCell::Real => Cell::Float(self.parse(value)?),
            RawCell::Text => Cell::Varchar(value.to_owned()),
            RawCell::Binary => Cell::Binary(hex::decode(value).map_err(|_| invalid())?),
            RawCell::Boolean => Cell::Boolean(match value {
                "true" | "TRUE" | "1" => true,
                "false" | "FALSE" | "0" => false,
                _ => return Err(invalid()),
            }),
            RawCell::Date => {
                let days: i64 = self.parse(value)?;
                NaiveDate::from_ymd_opt(1970, 1, 1)
                    .and_then(|epoch| epoch.checked_add_signed(Duration::days(days)))
                    .map(Cell::Date)
                    .ok_or_else(invalid)?
            }
            RawCell::Time => {
                let (seconds, nanos) = split_seconds(value).ok_or_else(invalid)?;
                u32::try_from(seconds)
                    .ok()
                    .and_then(|seconds| NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos))
                    .map(Cell::Time)
                    .ok_or_else(invalid)?
            }
            RawCell::TimestampLtz => {
                let (seconds, nanos) = split_seconds(value).ok_or_else(invalid)?;
                Local
                    .timestamp_opt(seconds, nanos)
                    .single()
                    .map(Cell::TimestampLtz)
                    .ok_or_else(invalid)?
            }
            RawCell::TimestampNtz => {
                let (seconds, nanos) = split_seconds(value).ok_or_else(invalid)?;
                DateTime::<Utc>::from_timestamp(seconds, nanos)
                    .map(|utc| Cell::TimestampNtz(utc.naive_utc()))
                    .ok_or_else(invalid)?
            }
            // This is just too complex to support yet
            RawCell::TimestampTz => Cell::Null,
        };
        Ok(cell)
    }

    fn parse<T: FromStr>(&self, value: &str) -> SnowflakeResult<T> {
        value.parse().map_err(|_| SnowflakeError::CellParse {
            column_type: self.name(),
            value: value.to_owned(),
        })
    }
}

/// Split `"<seconds>.<fraction>"` into whole seconds and nanoseconds without going through f64.
///
/// Negative values are floored, so `-0.5` becomes `(-1, 500_000_000)`.
fn split_seconds(value: &str) -> Option<(i64, u32)> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let seconds: i64 = whole.parse().ok()?;
    let digits = &fraction[..fraction.len().min(9)];
    let nanos = if digits.is_empty() {
        0
    } else {
        digits.parse::<u32>().ok()? * 10u32.pow(9 - digits.len() as u32)
    };
    if whole.starts_with('-') && nanos > 0 {
        Some((seconds - 1, 1_000_000_000 - nanos))
    } else {
        Some((seconds, nanos))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Int(i128),
    Float(f64),
    Varchar(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    TimestampLtz(DateTime<Local>),
    TimestampNtz(NaiveDateTime),
}
