//! Feed configuration.

use std::path::PathBuf;
use std::time::Duration;

use schoolfeed_providers::untis::{Credentials, UntisConfig};

use crate::cache::{DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL, ResponseCache};
use crate::error::{FeedError, FeedResult};

/// Feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Login credentials; required before any live fetch.
    pub credentials: Option<Credentials>,

    /// WebUntis server settings.
    pub untis: UntisConfig,

    /// Root directory of the response cache.
    pub cache_dir: PathBuf,

    /// How long cached payloads stay valid.
    pub cache_ttl: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            untis: UntisConfig::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl FeedConfig {
    /// Creates a configuration with the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Default::default()
        }
    }

    /// Builder: set the WebUntis settings.
    pub fn with_untis(mut self, untis: UntisConfig) -> Self {
        self.untis = untis;
        self
    }

    /// Builder: set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Builder: set the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Returns the credentials or a configuration error if none are set.
    pub fn credentials(&self) -> FeedResult<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| FeedError::config("no WebUntis credentials configured"))
    }

    pub(crate) fn cache(&self) -> ResponseCache {
        ResponseCache::new(&self.cache_dir).with_ttl(self.cache_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = FeedConfig::default();
        assert!(config.credentials.is_none());
        assert_eq!(config.cache_dir, PathBuf::from("./tmp/cache"));
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert!(config.credentials().unwrap_err().is_auth_error());
    }

    #[test]
    fn custom_config() {
        let config = FeedConfig::new(Credentials::password("display", "pw"))
            .with_cache_dir("/var/cache/schoolfeed")
            .with_cache_ttl(Duration::from_secs(60))
            .with_untis(UntisConfig::default().with_school("Other-School"));

        assert_eq!(config.credentials().unwrap().username(), "display");
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/schoolfeed"));
        assert_eq!(config.untis.school, "Other-School");

        let cache = config.cache();
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }
}
