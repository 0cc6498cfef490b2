//! WebUntis session client and source fetchers.
//!
//! This module provides an [`UntisClient`] that logs in to a WebUntis
//! server and fetches exams, school calendar entries, timetable events and
//! personal timetables.
//!
//! # Features
//!
//! - Password login via JSON-RPC and app-secret login via one-time codes
//! - Lazily refreshed bearer tokens shared by concurrent requests
//! - Status validation mapped to [`ProviderErrorCode`](crate::ProviderErrorCode)s
//! - Parsers for the endpoints' differing JSON shapes
//!
//! # Example
//!
//! ```ignore
//! use schoolfeed_providers::untis::{Credentials, UntisClient, UntisConfig};
//!
//! let client = UntisClient::new(UntisConfig::default())?;
//! let session = client.login(&Credentials::password("display", "secret")).await?;
//! let exams = client.exams(&session, &range).await;
//! client.logout(session).await?;
//! ```

mod auth;
mod client;
mod config;
mod parse;
mod records;
mod session;
pub mod totp;

pub use client::{PROVIDER_NAME, RequestBody, UntisClient};
pub use config::UntisConfig;
pub use parse::{
    PersonType, combine_exams, parse_calendar, parse_day_overview, parse_exams, parse_individual,
    parse_persons,
};
pub use records::{
    CalendarEvent, Exam, IndividualEntries, TimetableEvent, UntisValue, parse_timestamp,
};
pub use reqwest::Method;
pub use session::{Credentials, Session, token_is_valid};
