//! Parsers for the WebUntis response bodies.
//!
//! Each endpoint uses its own JSON shape. The timetable entries endpoint in
//! particular lists full-day entries (`dayEntries`) with object positions and
//! timed entries (`gridEntries`) with arrays of `{current}` positions; both
//! are folded into [`CalendarEntry`] before being turned into records.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::error::{ProviderError, ProviderResult};

use super::records::{
    CalendarEvent, Exam, IndividualEntries, TimetableEvent, UntisValue, null_default,
    parse_timestamp,
};

/// Kind of person whose personal timetable is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonType {
    Teacher,
    Student,
}

impl PersonType {
    /// Lowercase key used in filter payloads (`"teacher"`).
    pub fn key(&self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// Resource type used in query parameters (`"TEACHER"`).
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Teacher => "TEACHER",
            Self::Student => "STUDENT",
        }
    }
}

impl std::fmt::Display for PersonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Exams
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ExamsResponse {
    #[serde(default, deserialize_with = "null_default")]
    exams: Vec<Exam>,
}

/// Parses the exams endpoint (`{"exams": [...]}`).
pub fn parse_exams(body: &str) -> ProviderResult<Vec<Exam>> {
    let response: ExamsResponse = serde_json::from_str(body)?;
    debug!(count = response.exams.len(), "parsed exams");
    Ok(response.exams)
}

// ---------------------------------------------------------------------------
// Timetable entries (calendar and personal timetables)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct EntriesResponse {
    #[serde(default, deserialize_with = "null_default")]
    days: Vec<EntriesDay>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntriesDay {
    date: NaiveDate,
    #[serde(default, deserialize_with = "null_default")]
    day_entries: Vec<DayEntry>,
    #[serde(default, deserialize_with = "null_default")]
    grid_entries: Vec<GridEntry>,
}

impl EntriesDay {
    fn entries(&self) -> impl Iterator<Item = CalendarEntry<'_>> {
        self.day_entries
            .iter()
            .map(CalendarEntry::Day)
            .chain(self.grid_entries.iter().map(CalendarEntry::Grid))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EntryDuration {
    #[serde(deserialize_with = "null_default")]
    start: String,
    #[serde(deserialize_with = "null_default")]
    end: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DayEntry {
    #[serde(deserialize_with = "null_default")]
    id: i64,
    #[serde(deserialize_with = "null_default")]
    name: String,
    #[serde(deserialize_with = "null_default")]
    duration: EntryDuration,
    #[serde(deserialize_with = "null_default")]
    position1: UntisValue,
    #[serde(deserialize_with = "null_default")]
    position2: UntisValue,
    #[serde(deserialize_with = "null_default")]
    position3: UntisValue,
    #[serde(deserialize_with = "null_default")]
    notes_all: String,
    #[serde(deserialize_with = "null_default")]
    color: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GridPosition {
    #[serde(deserialize_with = "null_default")]
    current: UntisValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GridEntry {
    #[serde(deserialize_with = "null_default")]
    ids: Vec<i64>,
    #[serde(rename = "type", deserialize_with = "null_default")]
    kind: String,
    #[serde(deserialize_with = "null_default")]
    name: String,
    #[serde(deserialize_with = "null_default")]
    duration: EntryDuration,
    #[serde(deserialize_with = "null_default")]
    lesson_info: String,
    #[serde(deserialize_with = "null_default")]
    position1: Vec<GridPosition>,
    #[serde(deserialize_with = "null_default")]
    position2: Vec<GridPosition>,
    #[serde(deserialize_with = "null_default")]
    position3: Vec<GridPosition>,
    #[serde(deserialize_with = "null_default")]
    position4: Vec<GridPosition>,
    #[serde(deserialize_with = "null_default")]
    notes_all: String,
    #[serde(deserialize_with = "null_default")]
    color: String,
}

impl GridEntry {
    fn first(positions: &[GridPosition]) -> &UntisValue {
        static EMPTY: UntisValue = UntisValue {
            id: 0,
            short_name: String::new(),
            long_name: String::new(),
            display_name: String::new(),
        };
        positions.first().map(|p| &p.current).unwrap_or(&EMPTY)
    }

    fn long_names(positions: &[GridPosition]) -> Vec<String> {
        positions
            .iter()
            .map(|p| p.current.long_name.clone())
            .collect()
    }
}

/// A timetable entry as listed under one day.
///
/// Full-day entries and timed grid entries carry the same information in
/// different shapes.
#[derive(Debug, Clone, Copy)]
enum CalendarEntry<'a> {
    Day(&'a DayEntry),
    Grid(&'a GridEntry),
}

impl<'a> CalendarEntry<'a> {
    fn name(&self) -> &'a str {
        match self {
            Self::Day(e) => &e.name,
            Self::Grid(e) => &e.name,
        }
    }

    fn to_calendar_event(self, day: NaiveDate) -> CalendarEvent {
        let midnight = day.and_time(NaiveTime::MIN);
        let (id, duration, title, location, calendar, notes, color, full_day) = match self {
            Self::Day(e) => (
                e.id,
                &e.duration,
                &e.position1,
                &e.position2,
                &e.position3,
                &e.notes_all,
                &e.color,
                true,
            ),
            Self::Grid(e) => (
                e.ids.first().copied().unwrap_or_default(),
                &e.duration,
                GridEntry::first(&e.position1),
                GridEntry::first(&e.position2),
                GridEntry::first(&e.position3),
                &e.notes_all,
                &e.color,
                false,
            ),
        };

        // Multi-day entries are listed under every day they cover; pin the
        // start to the listed day so the event is bucketed there.
        let start = match parse_timestamp(&duration.start) {
            Some(start) if start.date() == day => start,
            _ => midnight,
        };
        let end = parse_timestamp(&duration.end)
            .filter(|end| *end >= start)
            .unwrap_or(start);

        CalendarEvent {
            id,
            name: title.short_name.clone(),
            notes: notes.clone(),
            date: day,
            start,
            end,
            full_day,
            location: location.short_name.clone(),
            calendar: calendar.short_name.clone(),
            color: color.clone(),
        }
    }
}

fn calendar_events(response: &EntriesResponse, calendar_name: &str) -> Vec<CalendarEvent> {
    response
        .days
        .iter()
        .flat_map(|day| {
            day.entries()
                .filter(|entry| entry.name() == calendar_name)
                .map(move |entry| entry.to_calendar_event(day.date))
        })
        .collect()
}

/// Parses a timetable entries body into the entries of one calendar
/// integration.
pub fn parse_calendar(body: &str, calendar_name: &str) -> ProviderResult<Vec<CalendarEvent>> {
    let response: EntriesResponse = serde_json::from_str(body)?;
    let events = calendar_events(&response, calendar_name);
    debug!(count = events.len(), calendar = %calendar_name, "parsed calendar entries");
    Ok(events)
}

/// Parses a personal timetable requested with `EVENT` and `EXAM` periods.
///
/// Consecutive exam periods with the same name on one day are combined.
pub fn parse_individual(body: &str, calendar_name: &str) -> ProviderResult<IndividualEntries> {
    let response: EntriesResponse = serde_json::from_str(body)?;
    let mut entries = IndividualEntries {
        calendar: calendar_events(&response, calendar_name),
        ..IndividualEntries::default()
    };

    for entry in response.days.iter().flat_map(|day| day.grid_entries.iter()) {
        let (Some(start), Some(end)) = (
            parse_timestamp(&entry.duration.start),
            parse_timestamp(&entry.duration.end),
        ) else {
            trace!(kind = %entry.kind, "skipping entry without duration");
            continue;
        };

        match entry.kind.as_str() {
            "EVENT" => entries.timetable.push(TimetableEvent {
                title: entry.lesson_info.clone(),
                start,
                end,
                classes: GridEntry::long_names(&entry.position1),
                teachers: GridEntry::long_names(&entry.position2),
            }),
            "EXAM" => {
                let room = &GridEntry::first(&entry.position4).short_name;
                entries.exams.push(Exam {
                    name: entry.lesson_info.clone(),
                    start: Some(start),
                    end: Some(end),
                    rooms: if room.is_empty() {
                        Vec::new()
                    } else {
                        vec![UntisValue::short(room.clone())]
                    },
                    ..Exam::default()
                });
            }
            _ => {}
        }
    }

    entries.exams = combine_exams(entries.exams);
    debug!(
        timetable = entries.timetable.len(),
        calendar = entries.calendar.len(),
        exams = entries.exams.len(),
        "parsed personal timetable"
    );
    Ok(entries)
}

/// Merges exams spanning several lessons.
///
/// Exams are ordered by name, then start. A run of exams with the same name
/// on the same day becomes one exam from the first start to the latest end.
pub fn combine_exams(mut exams: Vec<Exam>) -> Vec<Exam> {
    exams.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.start.cmp(&b.start)));

    let mut combined: Vec<Exam> = Vec::with_capacity(exams.len());
    for exam in exams {
        if let Some(last) = combined.last_mut() {
            let same_day = match (last.start, exam.start) {
                (Some(a), Some(b)) => a.date() == b.date(),
                _ => false,
            };
            if last.name == exam.name && same_day {
                if exam.end > last.end {
                    last.end = exam.end;
                }
                continue;
            }
        }
        combined.push(exam);
    }
    combined
}

// ---------------------------------------------------------------------------
// Timetable day overview
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OverviewResponse {
    result: OverviewResult,
}

#[derive(Deserialize)]
struct OverviewResult {
    data: OverviewData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverviewData {
    #[serde(default, deserialize_with = "null_default")]
    element_ids: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    element_periods: HashMap<String, Vec<Period>>,
    #[serde(default, deserialize_with = "null_default")]
    elements: Vec<Element>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Period {
    #[serde(deserialize_with = "null_default")]
    lesson_text: String,
    /// `YYYYMMDD` as a number.
    #[serde(deserialize_with = "null_default")]
    date: u32,
    /// `HHMM` as a number.
    #[serde(deserialize_with = "null_default")]
    start_time: u32,
    #[serde(deserialize_with = "null_default")]
    end_time: u32,
    #[serde(deserialize_with = "null_default")]
    elements: Vec<ElementRef>,
    #[serde(rename = "is", deserialize_with = "null_default")]
    flags: PeriodFlags,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PeriodFlags {
    #[serde(deserialize_with = "null_default")]
    event: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ElementRef {
    #[serde(rename = "type", deserialize_with = "null_default")]
    kind: i64,
    #[serde(deserialize_with = "null_default")]
    id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Element {
    #[serde(rename = "type", deserialize_with = "null_default")]
    kind: i64,
    #[serde(deserialize_with = "null_default")]
    id: i64,
    #[serde(deserialize_with = "null_default")]
    name: String,
}

const ELEMENT_CLASS: i64 = 1;
const ELEMENT_TEACHER: i64 = 2;

fn period_time(date: u32, hhmm: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt((date / 10_000) as i32, date / 100 % 100, date % 100)?
        .and_hms_opt(hhmm / 100, hhmm % 100, 0)
}

/// Parses the day overview (`Timetable.do`) into timetable events.
///
/// Only periods flagged as events are kept. The same event is listed once
/// per participating class; those copies are merged.
pub fn parse_day_overview(body: &str) -> ProviderResult<Vec<TimetableEvent>> {
    let response: OverviewResponse = serde_json::from_str(body)?;
    let data = response.result.data;
    let elements = &data.elements;

    let names = |period: &Period, kind: i64| -> Vec<String> {
        period
            .elements
            .iter()
            .filter(|r| r.kind == kind)
            .flat_map(|r| {
                elements
                    .iter()
                    .filter(move |e| e.kind == kind && e.id == r.id)
                    .map(|e| e.name.clone())
            })
            .collect()
    };

    let mut events: Vec<TimetableEvent> = Vec::new();
    for element_id in &data.element_ids {
        let Some(periods) = data.element_periods.get(&element_id.to_string()) else {
            continue;
        };
        for period in periods.iter().filter(|p| p.flags.event) {
            let (Some(start), Some(end)) = (
                period_time(period.date, period.start_time),
                period_time(period.date, period.end_time),
            ) else {
                warn!(date = period.date, "skipping event period with invalid time");
                continue;
            };

            let classes = names(period, ELEMENT_CLASS);
            let teachers = names(period, ELEMENT_TEACHER);

            match events
                .iter_mut()
                .find(|e| e.title == period.lesson_text && e.start == start && e.end == end)
            {
                Some(existing) => {
                    existing.classes.extend(classes);
                    existing.teachers.extend(teachers);
                }
                None => events.push(TimetableEvent {
                    title: period.lesson_text.clone(),
                    start,
                    end,
                    classes,
                    teachers,
                }),
            }
        }
    }

    for event in &mut events {
        event.classes.sort();
        event.classes.dedup();
        event.teachers.sort();
        event.teachers.dedup();
    }

    debug!(count = events.len(), "parsed timetable events");
    Ok(events)
}

// ---------------------------------------------------------------------------
// Persons
// ---------------------------------------------------------------------------

/// Parses the timetable filter listing (`{"teachers": [{"teacher": {...}}]}`).
pub fn parse_persons(body: &str, person_type: PersonType) -> ProviderResult<Vec<UntisValue>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let list_key = format!("{}s", person_type.key());

    let Some(items) = value.get(&list_key).and_then(|v| v.as_array()) else {
        return Err(ProviderError::invalid_response(format!(
            "person listing has no '{}' array",
            list_key
        )));
    };

    items
        .iter()
        .filter_map(|item| item.get(person_type.key()))
        .map(|person| UntisValue::deserialize(person).map_err(ProviderError::from))
        .collect()
}
