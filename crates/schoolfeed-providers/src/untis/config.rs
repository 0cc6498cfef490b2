//! WebUntis connection configuration.

use std::time::Duration;
use url::Url;

/// Configuration for the WebUntis client.
///
/// The defaults describe the one school this crate is deployed for; tests
/// and other deployments override them with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct UntisConfig {
    /// Base URL of the WebUntis server, with a trailing slash.
    pub base_url: Url,

    /// School login name (sent as query parameter and cookie).
    pub school: String,

    /// Client identifier sent with JSON-RPC requests.
    pub app_id: String,

    /// Resource type whose timetable carries the school calendar.
    pub calendar_resource_type: String,

    /// Resource id whose timetable carries the school calendar.
    ///
    /// Must be readable by the logged in user.
    pub calendar_resource: u64,

    /// Name of the calendar integration to show and keep.
    pub calendar_name: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl UntisConfig {
    /// Default server.
    pub const DEFAULT_BASE_URL: &'static str = "https://herakles.webuntis.com/";

    /// Default school login name.
    pub const DEFAULT_SCHOOL: &'static str = "Marie-Curie-Gym";

    /// Default client identifier.
    pub const DEFAULT_APP_ID: &'static str = "MCG-Display";

    /// Default calendar integration name.
    pub const DEFAULT_CALENDAR_NAME: &'static str = "Schuljahreskalender";

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Creates a configuration for the given server, keeping all other
    /// defaults.
    ///
    /// A missing trailing slash is added so relative paths join below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let mut raw = base_url.as_ref().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Self {
            base_url: Url::parse(&raw)?,
            ..Self::default()
        })
    }

    /// Sets the school login name.
    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = school.into();
        self
    }

    /// Sets the client identifier.
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    /// Sets the resource used to read the school calendar.
    pub fn with_calendar_resource(
        mut self,
        resource_type: impl Into<String>,
        resource: u64,
    ) -> Self {
        self.calendar_resource_type = resource_type.into();
        self.calendar_resource = resource;
        self
    }

    /// Sets the calendar integration name.
    pub fn with_calendar_name(mut self, name: impl Into<String>) -> Self {
        self.calendar_name = name.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves a path relative to the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

impl Default for UntisConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(Self::DEFAULT_BASE_URL).expect("default base URL is valid"),
            school: Self::DEFAULT_SCHOOL.to_string(),
            app_id: Self::DEFAULT_APP_ID.to_string(),
            calendar_resource_type: "STUDENT".to_string(),
            calendar_resource: 5186,
            calendar_name: Self::DEFAULT_CALENDAR_NAME.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }
}
