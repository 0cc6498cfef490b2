//! Source records to canonical [`Event`] conversion.
//!
//! Exams arrive with terse, inconsistently filled fields, so their titles and
//! descriptions are assembled heuristically:
//!
//! 1. The title joins the exam type, the classes (collapsed to grade levels
//!    where possible), the subject, the course type and the teachers
//! 2. The description keeps whatever part of the exam's name and text is not
//!    already said by the title
//!
//! Calendar entries and timetable events map more directly. All functions
//! here are pure.

use std::sync::LazyLock;

use regex::Regex;
use schoolfeed_core::{Event, EventCategory, Subject};
use tracing::warn;

use crate::untis::{CalendarEvent, Exam, TimetableEvent};

/// Matches the grade level in a class name (`"7a"` → `"7"`).
static GRADE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("Invalid grade regex"));

/// Characters ignored when judging whether a text adds information.
const FILLER_CHARS: &[char] = &[' ', '.', ',', '-', '/', '&', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Minimum share of a text that must remain for it to count as useful.
const USEFUL_RATIO: f64 = 0.4;

/// Combined length below which name and text are both shown.
const MAX_COMBINED_LEN: usize = 75;

/// Converts an exam from the exams endpoint.
///
/// Returns `None` for exams without a start time.
pub fn normalize_exam(exam: &Exam) -> Option<Event> {
    let title = exam_title(exam);
    build_exam_event(exam, title)
}

/// Converts an exam from a personal timetable.
///
/// These carry little more than a name, so the name is used as title when
/// nothing else is known.
pub fn normalize_individual_exam(exam: &Exam) -> Option<Event> {
    let mut title = exam_title(exam);
    if title.is_empty() {
        title = exam.name.clone();
    }
    build_exam_event(exam, title)
}

fn build_exam_event(exam: &Exam, title: String) -> Option<Event> {
    let Some(start) = exam.start else {
        warn!(exam_id = exam.id, name = %exam.name, "skipping exam without start time");
        return None;
    };
    let end = exam.end.filter(|end| *end >= start).unwrap_or(start);
    let location = exam
        .rooms
        .first()
        .map(|room| format_location(&room.short_name))
        .unwrap_or_default();
    let description = exam_description(exam, &title);

    Some(
        Event::new(title, EventCategory::Exam, start, end)
            .with_description(description)
            .with_location(location),
    )
}

/// Converts a school calendar entry.
pub fn normalize_calendar_event(event: &CalendarEvent) -> Event {
    Event::new(
        &event.name,
        calendar_category(event),
        event.start,
        event.end,
    )
    .with_full_day(event.full_day)
    .with_description(&event.notes)
    .with_location(format_location(&event.location))
}

/// Converts a timetable event; the title lists the participating classes.
pub fn normalize_timetable_event(event: &TimetableEvent) -> Event {
    let title = format!("{} {}", event.title, event.classes.join(", "));
    Event::new(title.trim(), EventCategory::Student, event.start, event.end)
}

// ---------------------------------------------------------------------------
// Exam titles
// ---------------------------------------------------------------------------

/// Builds the exam title from its non-empty labels.
pub fn exam_title(exam: &Exam) -> String {
    let class = class_label(exam);
    let subject = exam_subject(exam).map(|s| s.display_name()).unwrap_or_default();
    let labels = [
        type_label(exam),
        class.clone(),
        subject.to_string(),
        course_type(exam, &class).to_string(),
        teacher_label(exam),
    ];

    labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn type_label(exam: &Exam) -> String {
    match exam.exam_type.short_name.as_str() {
        "LEK-Test" => {
            if exam.name.contains("Test") || exam.text.contains("Test") {
                "Test".to_string()
            } else {
                "LEK".to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Collapses the exam's classes into a label.
///
/// Up to two classes are listed as they are. More classes collapse into
/// their grade levels: `Jg9` for one grade, `Jg 7, 8` for several.
pub fn class_label(exam: &Exam) -> String {
    let mut classes: Vec<String> = exam
        .classes
        .iter()
        .map(|class| class.short_name.replacen("Jhg", "Jg", 1))
        .filter(|class| !class.is_empty())
        .collect();
    classes.sort();
    classes.dedup();

    if classes.len() > 2 {
        let grades: Option<Vec<u32>> = classes
            .iter()
            .map(|class| GRADE_REGEX.find(class)?.as_str().parse().ok())
            .collect();

        if let Some(mut grades) = grades {
            grades.sort_unstable();
            grades.dedup();
            return match grades.as_slice() {
                [grade] => format!("Jg{}", grade),
                _ => format!(
                    "Jg {}",
                    grades
                        .iter()
                        .map(u32::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            };
        }
    }

    classes.join(", ")
}

/// Resolves the exam's subject.
///
/// An exam with a subject code is decided by the code alone. Without one,
/// the exam's name and text are searched for subject spellings.
pub fn exam_subject(exam: &Exam) -> Option<Subject> {
    if !exam.subject.short_name.is_empty() {
        return Subject::from_code(&exam.subject.short_name);
    }
    subject_from_text(&[&exam.name, &exam.text])
}

fn subject_from_text(texts: &[&str]) -> Option<Subject> {
    Subject::ALL.into_iter().find(|subject| {
        subject
            .variants()
            .iter()
            .any(|variant| texts.iter().any(|text| text.contains(variant)))
    })
}

/// `GK` or `LK` for upper school exams whose name, text or subject code says so.
fn course_type(exam: &Exam, class_label: &str) -> &'static str {
    if class_label != "Jg11" && class_label != "Jg12" {
        return "";
    }
    let subject_code: String = exam.subject.short_name.chars().take(2).collect();
    let haystacks = [
        exam.name.to_lowercase(),
        exam.text.to_lowercase(),
        subject_code.to_lowercase(),
    ];
    ["GK", "LK"]
        .into_iter()
        .find(|course| {
            let needle = course.to_lowercase();
            haystacks.iter().any(|h| h.contains(&needle))
        })
        .unwrap_or("")
}

fn teacher_label(exam: &Exam) -> String {
    exam.teachers
        .iter()
        .map(|teacher| match teacher.short_name.as_str() {
            "UrSoF" => "Urschel".to_string(),
            _ => teacher.long_name.clone(),
        })
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Exam descriptions
// ---------------------------------------------------------------------------

/// Builds the description from the parts of name and text the title lacks.
pub fn exam_description(exam: &Exam, title: &str) -> String {
    let used = used_words(exam, title);
    let name_useful = is_useful(&exam.name, &used);
    let text_useful = is_useful(&exam.text, &used);

    if name_useful
        && text_useful
        && exam.name.chars().count() + exam.text.chars().count() < MAX_COMBINED_LEN
    {
        format!("{} - {}", exam.name, exam.text)
    } else if text_useful {
        exam.text.clone()
    } else if name_useful {
        exam.name.clone()
    } else {
        String::new()
    }
}

/// Words already conveyed by the title, longest first.
fn used_words(exam: &Exam, title: &str) -> Vec<String> {
    let title_words: Vec<&str> = title.split(' ').filter(|w| !w.is_empty()).collect();
    let mut used: Vec<String> = Vec::new();

    if title_words.contains(&"GK") {
        used.extend(["Grund".to_string(), "Grundkurs".to_string()]);
    } else if title_words.contains(&"LK") {
        used.extend(["Leistungs".to_string(), "Leistungskurs".to_string()]);
    }
    if title_words.contains(&"KA") {
        used.push("Klassenarbeit".to_string());
    }
    if let Some(subject) = exam_subject(exam) {
        used.extend(subject.variants().into_iter().map(str::to_string));
    }
    used.extend(title_words.iter().map(|w| w.to_string()));

    used.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    used.dedup();
    used
}

/// Whether `text` still says something once the used words are removed.
///
/// At least 40% of the characters must remain after removing the words and
/// trimming separators and digits.
pub fn is_useful(text: &str, used_words: &[String]) -> bool {
    if text.is_empty() {
        return false;
    }
    let mut rest = text.to_string();
    for word in used_words.iter().filter(|w| !w.is_empty()) {
        rest = rest.replace(word.as_str(), "");
    }
    let remaining = rest.trim_matches(FILLER_CHARS).chars().count();
    remaining as f64 / text.chars().count() as f64 >= USEFUL_RATIO
}

// ---------------------------------------------------------------------------
// Calendar entries
// ---------------------------------------------------------------------------

/// Maps a calendar entry's sub-calendar to its category.
pub fn calendar_category(event: &CalendarEvent) -> EventCategory {
    match event.calendar.as_str() {
        "Termine Jahrgang 7-9" => EventCategory::LowerSecondary,
        "Termine Jahrgang 10 und Oberstufe" => EventCategory::UpperSecondary,
        "Lernende" => EventCategory::Student,
        "Lehrkräfte" => EventCategory::Teacher,
        "Öffentlich" if event.name.contains("AG") => EventCategory::ClubActivity,
        _ => EventCategory::Public,
    }
}

/// Shortens the sports hall room names.
pub fn format_location(room: &str) -> String {
    match room {
        "Turnhalle" => "TH",
        "SHA" => "TH (A)",
        "SHB" => "TH (B)",
        "SHC" => "TH (C)",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::untis::UntisValue;
    use chrono::{NaiveDate, NaiveDateTime};
    use insta::assert_snapshot;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn value(short: &str, long: &str) -> UntisValue {
        UntisValue {
            short_name: short.to_string(),
            long_name: long.to_string(),
            ..UntisValue::default()
        }
    }

    fn exam(kind: &str, classes: &[&str], subject: &str) -> Exam {
        Exam {
            exam_type: UntisValue::short(kind),
            classes: classes.iter().map(|c| UntisValue::short(*c)).collect(),
            subject: UntisValue::short(subject),
            start: Some(at(4, 8, 0)),
            end: Some(at(4, 9, 30)),
            ..Exam::default()
        }
    }

    mod titles {
        use super::*;

        #[test]
        fn full_title() {
            let mut e = exam("KA", &["7a"], "MA");
            e.teachers = vec![value("MüL", "Müller")];
            assert_snapshot!(exam_title(&e), @"KA 7a Mathematik Müller");
        }

        #[test]
        fn lek_test_type() {
            let mut e = exam("LEK-Test", &["8b"], "EN");
            assert_snapshot!(exam_title(&e), @"LEK 8b Englisch");
            e.text = "Vokabel-Test".to_string();
            assert_snapshot!(exam_title(&e), @"Test 8b Englisch");
            e.text = "vokabeltest".to_string();
            assert_snapshot!(exam_title(&e), @"LEK 8b Englisch");
        }

        #[test]
        fn upper_school_course_type() {
            let mut e = exam("Klausur", &["Jhg11"], "DE");
            e.name = "Deutsch Lk Klausur".to_string();
            assert_snapshot!(exam_title(&e), @"Klausur Jg11 Deutsch LK");

            let mut lower = exam("KA", &["10a"], "DE");
            lower.name = "LK".to_string();
            assert_snapshot!(exam_title(&lower), @"KA 10a Deutsch");
        }

        #[test]
        fn special_teacher_name() {
            let mut e = exam("KA", &[], "");
            e.teachers = vec![value("UrSoF", "Urschel-Sommerfeld"), value("Ber", "Berg")];
            assert_snapshot!(exam_title(&e), @"KA Urschel, Berg");
        }

        #[test]
        fn empty_labels_are_skipped() {
            assert_eq!(exam_title(&Exam::default()), "");
            assert_snapshot!(exam_title(&exam("", &["9c"], "")), @"9c");
        }
    }

    mod classes {
        use super::*;

        #[test]
        fn grade_collapse() {
            assert_eq!(class_label(&exam("", &["7a", "7b", "8c"], "")), "Jg 7, 8");
            assert_eq!(class_label(&exam("", &["9a", "9b", "9c"], "")), "Jg9");
            assert_eq!(class_label(&exam("", &["8b", "7a"], "")), "7a, 8b");
        }

        #[test]
        fn grades_sort_numerically() {
            assert_eq!(
                class_label(&exam("", &["10a", "9b", "10b", "9a"], "")),
                "Jg 9, 10"
            );
        }

        #[test]
        fn duplicates_and_year_prefix() {
            assert_eq!(class_label(&exam("", &["Jhg11", "Jg11"], "")), "Jg11");
            assert_eq!(class_label(&exam("", &["7a", "7a"], "")), "7a");
        }

        #[test]
        fn classes_without_grade_are_listed() {
            assert_eq!(
                class_label(&exam("", &["AG", "DaZ", "7a"], "")),
                "7a, AG, DaZ"
            );
        }
    }

    mod subjects {
        use super::*;

        #[test]
        fn by_code() {
            assert_eq!(exam_subject(&exam("", &[], "PH-GK1")), Some(Subject::Physik));
            assert_eq!(exam_subject(&exam("", &[], "xxSK")), Some(Subject::Seminarkurs));
        }

        #[test]
        fn unknown_code_does_not_fall_back_to_text() {
            let mut e = exam("", &[], "ZZ");
            e.name = "Mathe Nachschreiber".to_string();
            assert_eq!(exam_subject(&e), None);
        }

        #[test]
        fn by_text_without_code() {
            let mut e = exam("", &[], "");
            e.name = "Klausur Mathe".to_string();
            assert_eq!(exam_subject(&e), Some(Subject::Mathematik));

            e.name = "Politische Bildung Test".to_string();
            assert_eq!(exam_subject(&e), Some(Subject::PolitischeBildung));

            e.name = "Test".to_string();
            e.text = "Kapitel 3 (Bio)".to_string();
            assert_eq!(exam_subject(&e), Some(Subject::Biologie));
        }

        #[test]
        fn text_matches_substrings() {
            let mut e = exam("", &[], "");
            e.name = "BIO-Klausur".to_string();
            assert_eq!(exam_subject(&e), Some(Subject::Biologie));

            e.name = "Materialkunde".to_string();
            assert_eq!(exam_subject(&e), Some(Subject::Mathematik));
        }

        #[test]
        fn text_match_is_case_sensitive() {
            let mut e = exam("", &[], "");
            e.name = "klausur mathe".to_string();
            assert_eq!(exam_subject(&e), None);
        }
    }

    mod descriptions {
        use super::*;

        #[test]
        fn only_used_words_is_empty() {
            let mut e = exam("KA", &["7a"], "MA");
            e.name = "Mathematik KA".to_string();
            e.text = "Klassenarbeit Nr. 3".to_string();
            let title = exam_title(&e);
            assert_eq!(exam_description(&e, &title), "");
        }

        #[test]
        fn keeps_new_information() {
            let mut e = exam("KA", &["7a"], "MA");
            e.name = "Mathe".to_string();
            e.text = "Bruchrechnung und Dezimalzahlen".to_string();
            let title = exam_title(&e);
            assert_eq!(exam_description(&e, &title), "Bruchrechnung und Dezimalzahlen");
        }

        #[test]
        fn combines_short_name_and_text() {
            let mut e = exam("KA", &["7a"], "MA");
            e.name = "Nachschreiber".to_string();
            e.text = "Geometrie".to_string();
            let title = exam_title(&e);
            assert_eq!(exam_description(&e, &title), "Nachschreiber - Geometrie");
        }

        #[test]
        fn long_combination_prefers_text() {
            let mut e = exam("KA", &["7a"], "MA");
            e.name = "Nachschreibtermin für alle Erkrankten".to_string();
            e.text = "Geometrie, Flächeninhalte und Umfang von Vielecken".to_string();
            let title = exam_title(&e);
            assert_eq!(exam_description(&e, &title), e.text);
        }

        #[test]
        fn grundkurs_removed_whole() {
            let mut e = exam("Klausur", &["Jg12"], "BI");
            e.name = "Grundkurs".to_string();
            e.text = "Genetik GK".to_string();
            let title = exam_title(&e);
            assert_snapshot!(title, @"Klausur Jg12 Biologie GK");
            assert_eq!(exam_description(&e, &title), "Genetik GK");
        }

        #[test]
        fn usefulness_threshold() {
            let used = vec!["Mathematik".to_string()];
            assert!(!is_useful("", &used));
            assert!(!is_useful("Mathematik 1.", &used));
            // "Test" (4) of "Mathematik Test" (15) remains: below 40%.
            assert!(!is_useful("Mathematik Test", &used));
            // "Analysis" (8) of "Mathematik Analysis" (19) remains: above 40%.
            assert!(is_useful("Mathematik Analysis", &used));
        }
    }

    mod calendar {
        use super::*;

        fn entry(calendar: &str, name: &str) -> CalendarEvent {
            CalendarEvent {
                id: 1,
                name: name.to_string(),
                notes: String::new(),
                date: NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
                start: at(4, 0, 0),
                end: at(4, 23, 59),
                full_day: true,
                location: "SHA".to_string(),
                calendar: calendar.to_string(),
                color: String::new(),
            }
        }

        #[test]
        fn categories() {
            let cases = [
                ("Termine Jahrgang 7-9", "x", EventCategory::LowerSecondary),
                ("Termine Jahrgang 10 und Oberstufe", "x", EventCategory::UpperSecondary),
                ("Lernende", "x", EventCategory::Student),
                ("Lehrkräfte", "x", EventCategory::Teacher),
                ("Öffentlich", "Theater-AG Aufführung", EventCategory::ClubActivity),
                ("Öffentlich", "Tag der offenen Tür", EventCategory::Public),
                ("Sonstiges", "AG", EventCategory::Public),
                ("", "", EventCategory::Public),
            ];
            for (calendar, name, expected) in cases {
                assert_eq!(calendar_category(&entry(calendar, name)), expected, "{calendar}/{name}");
            }
        }

        #[test]
        fn normalized_entry() {
            let mut source = entry("Lernende", "Sportfest");
            source.notes = "Sportzeug mitbringen".to_string();
            let event = normalize_calendar_event(&source);
            assert_eq!(event.title, "Sportfest");
            assert_eq!(event.category, EventCategory::Student);
            assert_eq!(event.location, "TH (A)");
            assert_eq!(event.description, "Sportzeug mitbringen");
            assert!(event.full_day);
            assert_eq!(event.date, source.date);
        }

        #[test]
        fn locations() {
            assert_eq!(format_location("Turnhalle"), "TH");
            assert_eq!(format_location("SHB"), "TH (B)");
            assert_eq!(format_location("SHC"), "TH (C)");
            assert_eq!(format_location("R101"), "R101");
            assert_eq!(format_location(""), "");
        }
    }

    mod events {
        use super::*;

        #[test]
        fn exam_event() {
            let mut e = exam("KA", &["7a"], "MA");
            e.rooms = vec![UntisValue::short("Turnhalle")];
            let event = normalize_exam(&e).unwrap();
            assert_eq!(event.category, EventCategory::Exam);
            assert_eq!(event.location, "TH");
            assert_eq!(event.date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
            assert_eq!(event.end, at(4, 9, 30));
        }

        #[test]
        fn exam_without_start_is_skipped() {
            let mut e = exam("KA", &["7a"], "MA");
            e.start = None;
            assert!(normalize_exam(&e).is_none());
        }

        #[test]
        fn exam_without_end_ends_at_start() {
            let mut e = exam("KA", &["7a"], "MA");
            e.end = None;
            let event = normalize_exam(&e).unwrap();
            assert_eq!(event.end, event.start);
            assert_eq!(event.location, "");
        }

        #[test]
        fn individual_exam_falls_back_to_name() {
            let e = Exam {
                name: "Klausur".to_string(),
                start: Some(at(4, 8, 0)),
                end: Some(at(4, 9, 0)),
                rooms: vec![UntisValue::short("SHC")],
                ..Exam::default()
            };
            let event = normalize_individual_exam(&e).unwrap();
            assert_eq!(event.title, "Klausur");
            assert_eq!(event.description, "");
            assert_eq!(event.location, "TH (C)");
        }

        #[test]
        fn timetable_event() {
            let source = TimetableEvent {
                title: "Wandertag".to_string(),
                start: at(4, 8, 0),
                end: at(4, 13, 30),
                classes: vec!["7a".to_string(), "7b".to_string()],
                teachers: vec!["Müller".to_string()],
            };
            let event = normalize_timetable_event(&source);
            assert_snapshot!(event.title, @"Wandertag 7a, 7b");
            assert_eq!(event.category, EventCategory::Student);
            assert!(!event.full_day);

            let no_classes = TimetableEvent {
                classes: Vec::new(),
                ..source
            };
            assert_eq!(normalize_timetable_event(&no_classes).title, "Wandertag");
        }
    }
}
