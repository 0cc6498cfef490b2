//! Core types: events, subjects, date ranges, tracing

pub mod event;
pub mod subject;
pub mod time;
pub mod tracing;

pub use event::{Event, EventCategory, sort_events};
pub use subject::{Subject, SubjectInfo};
pub use time::{DATE_FORMAT, DEFAULT_DAYS, DateRange, DateRangeError};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
