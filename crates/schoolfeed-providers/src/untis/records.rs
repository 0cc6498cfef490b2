//! Intermediate records as returned by the WebUntis endpoints.
//!
//! These mirror the source payloads closely and are turned into canonical
//! [`Event`](schoolfeed_core::Event)s by the [`normalize`](crate::normalize)
//! module. WebUntis sends `null` for many absent values, so most fields
//! fall back to their defaults on `null` as well as when missing.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Timestamp layouts seen in WebUntis payloads, most specific first.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parses a local WebUntis timestamp.
///
/// Anything after the first 19 characters (fractions, offsets) is ignored,
/// and values without seconds are accepted.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.get(..19).unwrap_or(raw);
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Deserializes `null` as the type's default.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserializes an optional timestamp, treating `null` and `""` as absent.
pub(crate) fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", value))),
    }
}

/// A named WebUntis element (class, teacher, room, subject, exam type).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UntisValue {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub short_name: String,
    #[serde(deserialize_with = "null_default")]
    pub long_name: String,
    #[serde(deserialize_with = "null_default")]
    pub display_name: String,
}

impl UntisValue {
    /// Creates a value carrying only a short name.
    pub fn short(short_name: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            ..Self::default()
        }
    }
}

/// An exam, either from the exams endpoint or from a personal timetable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Exam {
    #[serde(rename = "examId", deserialize_with = "null_default")]
    pub id: i64,
    #[serde(rename = "examType", deserialize_with = "null_default")]
    pub exam_type: UntisValue,
    #[serde(rename = "examName", deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "examText", deserialize_with = "null_default")]
    pub text: String,
    #[serde(rename = "examStart", deserialize_with = "optional_timestamp")]
    pub start: Option<NaiveDateTime>,
    #[serde(rename = "examEnd", deserialize_with = "optional_timestamp")]
    pub end: Option<NaiveDateTime>,
    /// Duration in minutes.
    #[serde(rename = "examDuration", deserialize_with = "null_default")]
    pub duration: i64,
    #[serde(rename = "numStudents", deserialize_with = "null_default")]
    pub num_students: i64,
    #[serde(deserialize_with = "null_default")]
    pub subject: UntisValue,
    #[serde(deserialize_with = "null_default")]
    pub classes: Vec<UntisValue>,
    #[serde(deserialize_with = "null_default")]
    pub teachers: Vec<UntisValue>,
    #[serde(deserialize_with = "null_default")]
    pub rooms: Vec<UntisValue>,
}

/// An entry of the school calendar integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: i64,
    pub name: String,
    pub notes: String,
    /// The day the entry was listed under.
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub full_day: bool,
    pub location: String,
    /// Sub-calendar, e.g. `"Lehrkräfte"`.
    pub calendar: String,
    pub color: String,
}

/// A timetable event (excursion, project day, ...) with its participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub classes: Vec<String>,
    pub teachers: Vec<String>,
}

/// Everything a personal timetable returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndividualEntries {
    pub timetable: Vec<TimetableEvent>,
    pub calendar: Vec<CalendarEvent>,
    pub exams: Vec<Exam>,
}
