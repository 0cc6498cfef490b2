//! Output rendering for the event feed.
//!
//! - **Text**: one heading per day, one line per event
//! - **JSON**: the per-day map as an object keyed by `YYYY-MM-DD`

use std::fmt::Write;

use chrono::{Datelike, NaiveDate, Weekday};
use schoolfeed_core::Event;
use schoolfeed_server::DailyEvents;

const TIME_FORMAT: &str = "%H:%M";

/// Renders the feed for a terminal.
pub fn format_text(days: &DailyEvents) -> String {
    let mut out = String::new();
    for (day, events) in days {
        let _ = writeln!(out, "{}", day_heading(*day));
        if events.is_empty() {
            out.push_str("  -\n");
        }
        for event in events {
            let _ = writeln!(out, "  {}", event_line(event));
        }
    }
    out
}

/// Renders the feed as pretty-printed JSON.
pub fn format_json(days: &DailyEvents) -> serde_json::Result<String> {
    serde_json::to_string_pretty(days)
}

fn day_heading(day: NaiveDate) -> String {
    let weekday = match day.weekday() {
        Weekday::Mon => "Mo",
        Weekday::Tue => "Di",
        Weekday::Wed => "Mi",
        Weekday::Thu => "Do",
        Weekday::Fri => "Fr",
        Weekday::Sat => "Sa",
        Weekday::Sun => "So",
    };
    format!("{} {}", weekday, day.format("%d.%m.%Y"))
}

fn event_line(event: &Event) -> String {
    let time = if event.full_day {
        "ganztägig".to_string()
    } else {
        format!(
            "{}-{}",
            event.start.format(TIME_FORMAT),
            event.end.format(TIME_FORMAT)
        )
    };

    let mut line = format!("{:<11}  {}", time, event.title);
    if !event.location.is_empty() {
        let _ = write!(line, " @{}", event.location);
    }
    let _ = write!(line, " [{}]", event.category);
    if !event.description.is_empty() {
        let _ = write!(line, " ({})", event.description);
    }
    line
}
