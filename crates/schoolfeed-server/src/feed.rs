//! Event aggregation.
//!
//! [`EventFeed`] logs in, collects the normalized events of every source for
//! a date range, and buckets them per day. Each source consults the
//! [`ResponseCache`] first and only goes upstream on a miss, an expired
//! entry, or an empty payload.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use schoolfeed_core::{DateRange, Event, sort_events};
use schoolfeed_providers::untis::{PersonType, Session, UntisClient};
use schoolfeed_providers::{
    normalize_calendar_event, normalize_exam, normalize_individual_exam,
    normalize_timetable_event,
};
use tracing::{debug, info, trace, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::FeedConfig;
use crate::error::FeedResult;

const EXAMS_CACHE: &str = "exams";
const CALENDAR_CACHE: &str = "calendar";
const TIMETABLE_CACHE: &str = "timetable";

/// Events keyed by calendar day, one key per day of the requested range.
pub type DailyEvents = BTreeMap<NaiveDate, Vec<Event>>;

/// A person whose personal timetable is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonQuery {
    /// Display name as listed by the school system.
    pub name: String,
    /// Teacher or student.
    pub kind: PersonType,
}

impl PersonQuery {
    /// Creates a query for a teacher.
    pub fn teacher(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PersonType::Teacher,
        }
    }

    /// Creates a query for a student.
    pub fn student(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PersonType::Student,
        }
    }

    /// Builds a query from teacher and student parameters.
    ///
    /// A non-empty teacher wins over the student; `None` if neither is set.
    pub fn from_params(teacher: Option<&str>, student: Option<&str>) -> Option<Self> {
        match (non_empty(teacher), non_empty(student)) {
            (Some(teacher), _) => Some(Self::teacher(teacher)),
            (None, Some(student)) => Some(Self::student(student)),
            (None, None) => None,
        }
    }

    /// Cache name of the person's entries, e.g. `individual-teacher-Müller`.
    ///
    /// The name is kept verbatim; [`CacheKey`] encodes it for the filesystem.
    pub fn cache_name(&self) -> String {
        format!("individual-{}-{}", self.kind.key(), self.name)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Aggregates the school's event sources into a per-day feed.
#[derive(Debug, Clone)]
pub struct EventFeed {
    client: UntisClient,
    cache: ResponseCache,
    config: FeedConfig,
}

impl EventFeed {
    /// Creates a feed from its configuration.
    pub fn new(config: FeedConfig) -> FeedResult<Self> {
        let cache = config.cache();
        let client = UntisClient::new(config.untis.clone())?;
        Ok(Self {
            client,
            cache,
            config,
        })
    }

    /// Returns the response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Returns the events of `range`, optionally limited to one person's
    /// timetable.
    ///
    /// Every day of the range has a key, empty days map to an empty list.
    /// The session is logged out whether or not fetching succeeded.
    pub async fn get_events(
        &self,
        range: &DateRange,
        person: Option<&PersonQuery>,
    ) -> FeedResult<DailyEvents> {
        let credentials = self.config.credentials()?;

        info!(
            start = %range.start,
            end = %range.end,
            person = person.map(|p| p.name.as_str()),
            "Building event feed"
        );

        let session = self.client.login(credentials).await?;
        let result = match person {
            Some(person) => self.individual_events(&session, range, person).await,
            None => self.general_events(&session, range).await,
        };
        if let Err(e) = self.client.logout(session).await {
            warn!(error = %e, "Logout failed");
        }

        let mut events = result?;
        sort_events(&mut events);
        Ok(bucket_by_day(range, events))
    }

    /// Exams, school calendar and timetable events, fetched concurrently.
    async fn general_events(&self, session: &Session, range: &DateRange) -> FeedResult<Vec<Event>> {
        let (exams, calendar, timetable) = tokio::try_join!(
            self.exam_events(session, range),
            self.calendar_events(session, range),
            self.timetable_events(session, range),
        )?;

        debug!(
            exams = exams.len(),
            calendar = calendar.len(),
            timetable = timetable.len(),
            "Collected events"
        );

        let mut events = exams;
        events.extend(calendar);
        events.extend(timetable);
        Ok(events)
    }

    async fn exam_events(&self, session: &Session, range: &DateRange) -> FeedResult<Vec<Event>> {
        let key = CacheKey::new(EXAMS_CACHE, range);
        if let Some(events) = self.cached(&key) {
            return Ok(events);
        }

        let exams = self.client.exams(session, range).await?;
        let events: Vec<Event> = exams.iter().filter_map(normalize_exam).collect();
        self.store(&key, &events)?;
        Ok(events)
    }

    async fn calendar_events(&self, session: &Session, range: &DateRange) -> FeedResult<Vec<Event>> {
        let key = CacheKey::new(CALENDAR_CACHE, range);
        if let Some(events) = self.cached(&key) {
            return Ok(events);
        }

        let entries = self.client.calendar_events(session, range).await?;
        let events: Vec<Event> = entries.iter().map(normalize_calendar_event).collect();
        self.store(&key, &events)?;
        Ok(events)
    }

    async fn timetable_events(
        &self,
        session: &Session,
        range: &DateRange,
    ) -> FeedResult<Vec<Event>> {
        let key = CacheKey::new(TIMETABLE_CACHE, range);
        if let Some(events) = self.cached(&key) {
            return Ok(events);
        }

        let entries = self.client.timetable_events(session, range).await?;
        let events: Vec<Event> = entries.iter().map(normalize_timetable_event).collect();
        self.store(&key, &events)?;
        Ok(events)
    }

    async fn individual_events(
        &self,
        session: &Session,
        range: &DateRange,
        person: &PersonQuery,
    ) -> FeedResult<Vec<Event>> {
        let key = CacheKey::new(&person.cache_name(), range);
        if let Some(events) = self.cached(&key) {
            return Ok(events);
        }

        let entries = self
            .client
            .individual_entries(session, &person.name, person.kind, range)
            .await?;

        let mut events: Vec<Event> = entries
            .exams
            .iter()
            .filter_map(normalize_individual_exam)
            .collect();
        events.extend(entries.calendar.iter().map(normalize_calendar_event));
        events.extend(entries.timetable.iter().map(normalize_timetable_event));

        self.store(&key, &events)?;
        Ok(events)
    }

    /// Returns the cached events of an identity if they are fresh and
    /// non-empty. Anything else falls through to a live fetch.
    fn cached(&self, key: &CacheKey) -> Option<Vec<Event>> {
        if !self.cache.is_valid(key) {
            trace!(key = %key, "Cache expired or empty");
            return None;
        }

        let payload = match self.cache.load(key) {
            Ok(payload) => payload,
            Err(e) if e.is_miss() => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache");
                return None;
            }
        };

        match serde_json::from_slice::<Vec<Event>>(&payload) {
            Ok(events) if !events.is_empty() => {
                debug!(key = %key, count = events.len(), "Serving events from cache");
                Some(events)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cache payload");
                None
            }
        }
    }

    fn store(&self, key: &CacheKey, events: &[Event]) -> FeedResult<()> {
        let payload = serde_json::to_vec(events)?;
        self.cache.write(key, &payload)?;
        Ok(())
    }
}

/// Buckets sorted events per day, with a key for every day of `range`.
///
/// Events outside the range are dropped; input order is kept per day.
pub fn bucket_by_day(range: &DateRange, events: Vec<Event>) -> DailyEvents {
    let mut days: DailyEvents = range.days().map(|day| (day, Vec::new())).collect();
    for event in events {
        match days.get_mut(&event.date) {
            Some(bucket) => bucket.push(event),
            None => trace!(title = %event.title, date = %event.date, "Dropping event outside range"),
        }
    }
    days
}
