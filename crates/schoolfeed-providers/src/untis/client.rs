//! HTTP client for the WebUntis API.
//!
//! This module provides:
//! - login with password or app secret, and logout
//! - generic request plumbing (session cookie, lazily refreshed bearer token,
//!   status validation)
//! - typed fetchers for exams, the school calendar, timetable events and
//!   personal timetables

use chrono::Utc;
use reqwest::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use schoolfeed_core::{DATE_FORMAT, DateRange};
use serde_json::{Value, json};
use tracing::{debug, info, trace, warn};

use crate::error::{ProviderError, ProviderResult};

use super::auth::{
    JSONRPC_INTERN_PATH, JSONRPC_PATH, cookie_from_set_cookie, logout_body, parse_auth_response,
    parse_user_data, password_body, secret_body,
};
use super::config::UntisConfig;
use super::parse::{
    PersonType, parse_calendar, parse_day_overview, parse_exams, parse_individual, parse_persons,
};
use super::records::{CalendarEvent, Exam, IndividualEntries, TimetableEvent, UntisValue};
use super::session::{Credentials, Session, token_is_valid};
use super::totp;

/// Provider name attached to errors.
pub const PROVIDER_NAME: &str = "untis";

const TOKEN_PATH: &str = "WebUntis/api/token/new";
const EXAMS_PATH: &str = "WebUntis/api/rest/view/v1/exams";
const CALENDAR_PATH: &str = "WebUntis/api/rest/view/v1/timetable/calendar";
const ENTRIES_PATH: &str = "WebUntis/api/rest/view/v1/timetable/entries";
const FILTER_PATH: &str = "WebUntis/api/rest/view/v1/timetable/filter";
const TIMETABLE_PATH: &str = "WebUntis/Timetable.do";

/// Body of a request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    None,
    /// Sent as `application/json`.
    Json(Value),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
}

/// WebUntis API client.
///
/// The client itself is stateless apart from its connection pool; all
/// per-login state lives in a [`Session`].
#[derive(Debug, Clone)]
pub struct UntisClient {
    http: Client,
    config: UntisConfig,
}

impl UntisClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: UntisConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("schoolfeed/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProviderError::network(format!("Failed to create HTTP client: {}", e))
                    .with_provider(PROVIDER_NAME)
            })?;

        Ok(Self { http, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &UntisConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Login / logout
    // -----------------------------------------------------------------------

    /// Opens a session.
    pub async fn login(&self, credentials: &Credentials) -> ProviderResult<Session> {
        let session = match credentials {
            Credentials::Password { username, password } => {
                self.login_password(username, password).await?
            }
            Credentials::Secret { username, secret } => self.login_secret(username, secret).await?,
        };
        info!(
            user = %credentials.username(),
            person_id = session.person_id,
            "logged in to WebUntis"
        );
        Ok(session)
    }

    async fn login_password(&self, username: &str, password: &str) -> ProviderResult<Session> {
        let body = password_body(&self.config.app_id, username, password);
        let response = self
            .builder(Method::POST, JSONRPC_PATH, &[("school", self.config.school.clone())])?
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error("Login request failed", e))?;

        let text = read_body(check_status(response).await?).await?;
        let result = parse_auth_response(&text).map_err(|e| e.with_provider(PROVIDER_NAME))?;

        Ok(Session::new(result.session_id).with_person(
            result.person_id,
            result.person_type,
            result.klasse_id,
        ))
    }

    async fn login_secret(&self, username: &str, secret: &str) -> ProviderResult<Session> {
        let now = Utc::now();
        let otp = totp::generate(secret, now.timestamp().max(0) as u64)?;
        let body = secret_body(&self.config.app_id, username, &otp, now.timestamp_millis());

        let query = [
            ("m", "getUserData2017".to_string()),
            ("school", self.config.school.clone()),
            ("v", "i2.2".to_string()),
        ];
        let response = self
            .builder(Method::POST, JSONRPC_INTERN_PATH, &query)?
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error("Login request failed", e))?;
        let response = check_status(response).await?;

        let session_id = cookie_from_set_cookie(
            response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
            "JSESSIONID",
        )
        .ok_or_else(|| {
            ProviderError::authentication("login response sets no JSESSIONID cookie")
                .with_provider(PROVIDER_NAME)
        })?;

        let user = parse_user_data(&read_body(response).await?)
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;
        let person_type = match user.elem_type.as_str() {
            "TEACHER" => 2,
            "STUDENT" => 5,
            _ => 0,
        };
        let class_id = user.klassen_ids.first().copied().unwrap_or_default();

        Ok(Session::new(session_id).with_person(user.elem_id, person_type, class_id))
    }

    /// Ends a session.
    ///
    /// The session is consumed even if the call fails.
    pub async fn logout(&self, session: Session) -> ProviderResult<()> {
        let body = logout_body(&self.config.app_id);
        self.send(
            &session,
            Method::POST,
            JSONRPC_PATH,
            &[("school", self.config.school.clone())],
            RequestBody::Json(body),
            None,
        )
        .await?;
        debug!("logged out of WebUntis");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    /// Sends a request on a session and returns the response body.
    ///
    /// With `requires_auth` the current bearer token is attached, fetching a
    /// new one first if it is missing or expired.
    pub async fn request(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
        requires_auth: bool,
    ) -> ProviderResult<String> {
        let token = if requires_auth {
            Some(self.bearer_token(session).await?)
        } else {
            None
        };
        self.send(session, method, path, query, body, token.as_deref())
            .await
    }

    /// Returns a valid bearer token, refreshing it if needed.
    ///
    /// The session's token lock is held across the refresh so concurrent
    /// callers wait for one refresh instead of each fetching a token.
    async fn bearer_token(&self, session: &Session) -> ProviderResult<String> {
        let mut token = session.token.lock().await;
        if let Some(current) = token.as_deref() {
            if token_is_valid(current, Utc::now().timestamp()) {
                return Ok(current.to_string());
            }
        }

        debug!("refreshing bearer token");
        let fresh = self
            .send(session, Method::GET, TOKEN_PATH, &[], RequestBody::None, None)
            .await?
            .trim()
            .to_string();
        if fresh.is_empty() {
            return Err(ProviderError::authentication("token endpoint returned no token")
                .with_provider(PROVIDER_NAME));
        }

        *token = Some(fresh.clone());
        Ok(fresh)
    }

    async fn send(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
        token: Option<&str>,
    ) -> ProviderResult<String> {
        let mut request = self
            .builder(method.clone(), path, query)?
            .header(COOKIE, session.cookie_header(&self.config.school));

        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        request = match body {
            RequestBody::None => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Form(fields) => request.form(&fields),
        };

        trace!(method = %method, path = %path, "Sending request");

        let response = request
            .send()
            .await
            .map_err(|e| network_error("Request failed", e))?;
        read_body(check_status(response).await?).await
    }

    fn builder(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<RequestBuilder> {
        let mut url = self.config.endpoint(path).map_err(|e| {
            ProviderError::configuration(format!("Invalid request path '{}': {}", path, e))
                .with_provider(PROVIDER_NAME)
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(self.http.request(method, url))
    }

    // -----------------------------------------------------------------------
    // Fetchers
    // -----------------------------------------------------------------------

    /// Fetches the exams in a date range.
    pub async fn exams(&self, session: &Session, range: &DateRange) -> ProviderResult<Vec<Exam>> {
        let (start, end) = format_range(range);
        let query = [
            ("start", start),
            ("end", end),
            ("withDeleted", "false".to_string()),
        ];
        let body = self
            .request(session, Method::GET, EXAMS_PATH, &query, RequestBody::None, true)
            .await?;
        parse_exams(&body)
    }

    /// Fetches the school calendar in a date range.
    ///
    /// The calendar integration is switched on first so its entries show up
    /// in the configured resource's timetable.
    pub async fn calendar_events(
        &self,
        session: &Session,
        range: &DateRange,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let integrations = json!({
            "integrations": [{ "name": self.config.calendar_name, "active": true }]
        });
        self.request(
            session,
            Method::PUT,
            CALENDAR_PATH,
            &[],
            RequestBody::Json(integrations),
            true,
        )
        .await?;

        let (start, end) = format_range(range);
        let query = [
            ("start", start),
            ("end", end),
            ("format", "4".to_string()),
            ("resourceType", self.config.calendar_resource_type.clone()),
            ("resources", self.config.calendar_resource.to_string()),
            // rarely used period type, keeps the response small
            ("periodTypes", "OFFICE_HOUR".to_string()),
        ];
        let body = self
            .request(session, Method::GET, ENTRIES_PATH, &query, RequestBody::None, true)
            .await?;
        parse_calendar(&body, &self.config.calendar_name)
    }

    /// Fetches the timetable events of all classes.
    ///
    /// The day overview is requested for the first day of the range.
    pub async fn timetable_events(
        &self,
        session: &Session,
        range: &DateRange,
    ) -> ProviderResult<Vec<TimetableEvent>> {
        let query = [(
            "request.preventCache",
            Utc::now().timestamp_millis().to_string(),
        )];
        let form = vec![
            ("ajaxCommand".to_string(), "getDayOverviewTimetable".to_string()),
            ("elementType".to_string(), "1".to_string()),
            ("date".to_string(), range.start.format("%Y%m%d").to_string()),
            ("formatId".to_string(), "4".to_string()),
        ];
        let body = self
            .request(
                session,
                Method::POST,
                TIMETABLE_PATH,
                &query,
                RequestBody::Form(form),
                true,
            )
            .await?;
        parse_day_overview(&body)
    }

    /// Lists the persons of a type visible to the session.
    pub async fn persons(
        &self,
        session: &Session,
        person_type: PersonType,
    ) -> ProviderResult<Vec<UntisValue>> {
        let query = [
            ("resourceType", person_type.resource_type().to_string()),
            ("timetableType", "STANDARD".to_string()),
        ];
        let body = self
            .request(session, Method::GET, FILTER_PATH, &query, RequestBody::None, true)
            .await?;
        parse_persons(&body, person_type)
    }

    /// Fetches the personal timetable of a person, looked up by display name.
    pub async fn individual_entries(
        &self,
        session: &Session,
        person: &str,
        person_type: PersonType,
        range: &DateRange,
    ) -> ProviderResult<IndividualEntries> {
        let persons = self.persons(session, person_type).await?;
        let Some(found) = persons.iter().find(|p| p.display_name == person) else {
            warn!(person = %person, kind = %person_type, "person not found");
            return Err(ProviderError::not_found(format!(
                "{} '{}' does not exist",
                person_type, person
            ))
            .with_provider(PROVIDER_NAME));
        };

        let (start, end) = format_range(range);
        let query = [
            ("start", start),
            ("end", end),
            ("format", "4".to_string()),
            ("resourceType", person_type.resource_type().to_string()),
            ("resources", found.id.to_string()),
            ("periodTypes", "EVENT".to_string()),
            ("periodTypes", "EXAM".to_string()),
        ];
        let body = self
            .request(session, Method::GET, ENTRIES_PATH, &query, RequestBody::None, true)
            .await?;
        parse_individual(&body, &self.config.calendar_name)
    }
}

fn format_range(range: &DateRange) -> (String, String) {
    (
        range.start.format(DATE_FORMAT).to_string(),
        range.end.format(DATE_FORMAT).to_string(),
    )
}

fn network_error(context: &str, err: reqwest::Error) -> ProviderError {
    ProviderError::network(format!("{}: {}", context, err))
        .with_provider(PROVIDER_NAME)
        .with_source(err)
}

async fn read_body(response: Response) -> ProviderResult<String> {
    response
        .text()
        .await
        .map_err(|e| network_error("Failed to read response", e))
}

/// Maps non-success statuses to errors.
async fn check_status(response: Response) -> ProviderResult<Response> {
    let status = response.status();
    trace!(status = %status, "Received response");

    if status.is_success() {
        return Ok(response);
    }

    let err = match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::authentication("Authentication failed: session rejected")
        }
        StatusCode::FORBIDDEN => ProviderError::authorization("Access denied"),
        StatusCode::NOT_FOUND => ProviderError::not_found("Resource not found"),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::server("Too many requests to server"),
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            ProviderError::server(format!("Server error ({}): {}", s, body))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            ProviderError::invalid_response(format!("Unexpected status {}: {}", s, body))
        }
    };
    Err(err.with_provider(PROVIDER_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    #[test]
    fn client_creation() {
        let config = UntisConfig::new("http://127.0.0.1:9/")
            .unwrap()
            .with_timeout(Duration::from_secs(1));
        let client = UntisClient::new(config).unwrap();
        assert_eq!(client.config().school, "Marie-Curie-Gym");
    }

    #[test]
    fn builder_appends_query() {
        let client = UntisClient::new(UntisConfig::new("http://127.0.0.1:9/").unwrap()).unwrap();
        let request = client
            .builder(
                Method::GET,
                ENTRIES_PATH,
                &[
                    ("periodTypes", "EVENT".to_string()),
                    ("periodTypes", "EXAM".to_string()),
                ],
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:9/WebUntis/api/rest/view/v1/timetable/entries?periodTypes=EVENT&periodTypes=EXAM"
        );
    }

    #[test]
    fn range_formatting() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
        )
        .unwrap();
        assert_eq!(
            format_range(&range),
            ("2025-03-03".to_string(), "2025-03-09".to_string())
        );
    }
}
