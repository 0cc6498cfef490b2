//! WebUntis client and event normalization.
//!
//! This crate turns the school's WebUntis data into canonical events:
//!
//! - [`untis::UntisClient`] - Session handling and the source fetchers
//! - [`normalize`] - Heuristics that turn source records into [`Event`]s
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────────┐
//!              │  WebUntis server │
//!              └────────┬─────────┘
//!                       │
//!                       ▼
//!              ┌──────────────────┐
//!              │   UntisClient    │  login, token, request
//!              └────────┬─────────┘
//!                       │ parse
//!        ┌──────────────┼────────────────┐
//!        ▼              ▼                ▼
//!   ┌────────┐  ┌───────────────┐  ┌────────────────┐
//!   │  Exam  │  │ CalendarEvent │  │ TimetableEvent │
//!   └───┬────┘  └───────┬───────┘  └───────┬────────┘
//!       └───────────────┼──────────────────┘
//!                       ▼ normalize
//!                  ┌─────────┐
//!                  │  Event  │
//!                  └─────────┘
//! ```
//!
//! [`Event`]: schoolfeed_core::Event

pub mod error;
pub mod normalize;
pub mod untis;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{
    normalize_calendar_event, normalize_exam, normalize_individual_exam,
    normalize_timetable_event,
};
