//! Client configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/schoolfeed/config.toml`:
//!
//! ```toml
//! [untis]
//! server = "https://herakles.webuntis.com/"
//! school = "Marie-Curie-Gym"
//! username = "display"
//! password = "pass::school/untis"
//!
//! [cache]
//! dir = "./tmp/cache"
//! ttl_minutes = 60
//! ```
//!
//! `username`, `password` and `secret` accept secret references (see
//! [`crate::secret`]). Missing credentials fall back to the
//! `UNTIS_USERNAME`, `UNTIS_PASSWORD` and `UNTIS_SECRET` environment
//! variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use schoolfeed_providers::untis::{Credentials, UntisConfig};
use schoolfeed_server::{DEFAULT_CACHE_DIR, FeedConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::secret;

/// Environment variable holding the username.
pub const ENV_USERNAME: &str = "UNTIS_USERNAME";
/// Environment variable holding the password.
pub const ENV_PASSWORD: &str = "UNTIS_PASSWORD";
/// Environment variable holding the base32 app secret.
pub const ENV_SECRET: &str = "UNTIS_SECRET";

const REDACTED: &str = "[redacted]";

/// Configuration for the schoolfeed client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebUntis server and login.
    pub untis: UntisSettings,

    /// Response cache.
    pub cache: CacheSettings,
}

/// WebUntis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UntisSettings {
    /// Server base URL.
    pub server: String,
    /// School login name.
    pub school: String,
    /// Client identifier sent on login.
    pub app_id: String,
    /// Resource type whose timetable carries the school calendar.
    pub calendar_resource_type: String,
    /// Resource id whose timetable carries the school calendar.
    pub calendar_resource: u64,
    /// Name of the calendar integration.
    pub calendar_name: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,

    pub username: Option<String>,
    pub password: Option<String>,
    /// Base32 app secret, used when no password is set.
    pub secret: Option<String>,
}

impl Default for UntisSettings {
    fn default() -> Self {
        Self {
            server: UntisConfig::DEFAULT_BASE_URL.to_string(),
            school: UntisConfig::DEFAULT_SCHOOL.to_string(),
            app_id: UntisConfig::DEFAULT_APP_ID.to_string(),
            calendar_resource_type: "STUDENT".to_string(),
            calendar_resource: 5186,
            calendar_name: UntisConfig::DEFAULT_CALENDAR_NAME.to_string(),
            timeout_secs: UntisConfig::DEFAULT_TIMEOUT_SECS,
            username: None,
            password: None,
            secret: None,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Cache directory.
    pub dir: PathBuf,
    /// Minutes a cached payload stays valid.
    pub ttl_minutes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            ttl_minutes: 60,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parses the TOML text of a config file.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("schoolfeed")
            .join("config.toml")
    }

    /// Builds the feed configuration, resolving credentials from the file
    /// and the process environment.
    pub fn to_feed_config(&self) -> ClientResult<FeedConfig> {
        self.to_feed_config_with(|var| std::env::var(var).ok())
    }

    /// Like [`to_feed_config`](Self::to_feed_config), reading fallbacks
    /// through `env`.
    pub fn to_feed_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> ClientResult<FeedConfig> {
        let untis = &self.untis;
        let untis_config = UntisConfig::new(&untis.server)
            .map_err(|e| ClientError::config(format!("invalid server URL {:?}: {}", untis.server, e)))?
            .with_school(&untis.school)
            .with_app_id(&untis.app_id)
            .with_calendar_resource(&untis.calendar_resource_type, untis.calendar_resource)
            .with_calendar_name(&untis.calendar_name)
            .with_timeout(Duration::from_secs(untis.timeout_secs));

        let mut config = FeedConfig::default()
            .with_untis(untis_config)
            .with_cache_dir(&self.cache.dir)
            .with_cache_ttl(Duration::from_secs(self.cache.ttl_minutes.saturating_mul(60)));
        config.credentials = untis.credentials(env)?;
        Ok(config)
    }

    /// Returns a copy safe to print: inline passwords and secrets are
    /// replaced, references are kept.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for value in [&mut copy.untis.password, &mut copy.untis.secret]
            .into_iter()
            .flatten()
        {
            if matches!(secret::SecretRef::parse(value.as_str()), secret::SecretRef::Plain(_)) {
                *value = REDACTED.to_string();
            }
        }
        copy
    }
}

impl UntisSettings {
    /// Resolves the credentials.
    ///
    /// Each field falls back to its environment variable. A password wins
    /// over an app secret. Returns `None` when no username or neither
    /// password nor secret is available.
    fn credentials(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> ClientResult<Option<Credentials>> {
        let lookup = |configured: &Option<String>, var: &str| -> ClientResult<Option<String>> {
            let value = match configured {
                Some(value) => Some(secret::resolve(value)?),
                None => env(var),
            };
            Ok(value.filter(|v| !v.is_empty()))
        };

        let Some(username) = lookup(&self.username, ENV_USERNAME)? else {
            return Ok(None);
        };
        if let Some(password) = lookup(&self.password, ENV_PASSWORD)? {
            return Ok(Some(Credentials::password(username, password)));
        }
        if let Some(secret) = lookup(&self.secret, ENV_SECRET)? {
            return Ok(Some(Credentials::secret(username, secret)));
        }
        Ok(None)
    }
}
