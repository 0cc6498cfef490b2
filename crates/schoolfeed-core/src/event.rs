//! Event types for the school feed.
//!
//! This module provides the canonical event representation shared by every
//! source:
//! - [`Event`]: a normalized exam, calendar entry or timetable event
//! - [`EventCategory`]: the audience/kind of an event

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The category of an event.
///
/// Categories decide how an event is grouped and colored on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Open to everyone.
    Public,
    /// Club activity ("AG").
    ClubActivity,
    /// Exam, test or class test.
    Exam,
    /// Concerns students.
    Student,
    /// Concerns grades 7 to 9.
    LowerSecondary,
    /// Concerns grade 10 and the upper school.
    UpperSecondary,
    /// Concerns teachers.
    Teacher,
}

impl EventCategory {
    /// Returns the label shown on the display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Public => "Öffentlich",
            Self::ClubActivity => "AG",
            Self::Exam => "Prüfung",
            Self::Student => "Lernende",
            Self::LowerSecondary => "Sek I",
            Self::UpperSecondary => "Sek II",
            Self::Teacher => "Lehrkräfte",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A normalized event from any source.
///
/// Times are local wall-clock times as reported by the school system.
/// `date` is always the calendar day of `start`; full-day events still carry
/// a concrete `start` and `end` which are only used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Display title.
    pub title: String,
    /// Optional longer description (empty if none).
    #[serde(default)]
    pub description: String,
    /// The category of the event.
    pub category: EventCategory,
    /// Calendar day the event belongs to.
    pub date: NaiveDate,
    /// Whether the event has no meaningful time of day.
    pub full_day: bool,
    /// When the event starts.
    pub start: NaiveDateTime,
    /// When the event ends.
    pub end: NaiveDateTime,
    /// Formatted location (empty if unknown).
    #[serde(default)]
    pub location: String,
}

impl Event {
    /// Creates a new timed event. `date` is derived from `start`.
    pub fn new(
        title: impl Into<String>,
        category: EventCategory,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category,
            date: start.date(),
            full_day: false,
            start,
            end,
            location: String::new(),
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to mark the event as full-day.
    pub fn with_full_day(mut self, full_day: bool) -> Self {
        self.full_day = full_day;
        self
    }

    /// Returns true if the event lies on the given day.
    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.date == day
    }

    /// Total display order of events.
    ///
    /// Start ascending, full-day before timed at equal start, end ascending,
    /// title ascending. Description, location and category break any
    /// remaining ties so the order does not depend on input order.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| other.full_day.cmp(&self.full_day))
            .then_with(|| self.end.cmp(&other.end))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.description.cmp(&other.description))
            .then_with(|| self.location.cmp(&other.location))
            .then_with(|| self.category.cmp(&other.category))
    }
}

/// Sorts events into display order (see [`Event::display_cmp`]).
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(Event::display_cmp);
}
