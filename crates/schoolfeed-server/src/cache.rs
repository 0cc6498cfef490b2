//! File-backed response cache.
//!
//! Every payload lives in `<dir>/<name>/` in a file named
//! `<name>-<start>-<end>-<written>`, with the range dates as `YYYYMMDD` and
//! the write time as `YYYYMMDDHHMM`. Only the newest file of an identity is
//! kept. Writes go to a hidden temp file that is renamed into place, so a
//! reader never sees a partial payload. There is no cross-process lock: two
//! writers racing on one identity both succeed and the newer file wins.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use schoolfeed_core::DateRange;
use thiserror::Error;
use tracing::{debug, trace, warn};

const DATE_FORMAT: &str = "%Y%m%d";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "./tmp/cache";

/// Default time-to-live of a cached payload.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors returned by the cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Nothing is cached for the identity.
    #[error("no cached payload for {0}")]
    Miss(String),

    /// Reading or writing a cache file failed.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Returns true for a cache miss.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_))
    }

    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Identity of a cached payload: a source name and the requested range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    start: NaiveDate,
    end: NaiveDate,
}

impl CacheKey {
    /// Creates a key; the name is encoded with [`encode_name`].
    pub fn new(name: &str, range: &DateRange) -> Self {
        Self {
            name: encode_name(name),
            start: range.start,
            end: range.end,
        }
    }

    /// Returns the encoded name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn prefix(&self) -> String {
        format!(
            "{}-{}-{}-",
            self.name,
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }

    fn file_name(&self, written: NaiveDateTime) -> String {
        format!("{}{}", self.prefix(), written.format(TIMESTAMP_FORMAT))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}..{}", self.name, self.start, self.end)
    }
}

/// Percent-encodes a cache name into a single path component.
///
/// Alphanumerics and `-_.~` stay as they are; a leading `.` is escaped so
/// entries never become hidden files or parent references. Distinct names
/// always map to distinct components; the empty name becomes `%`.
pub fn encode_name(name: &str) -> String {
    let encoded = urlencoding::encode(name);
    match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None if encoded.is_empty() => "%".to_string(),
        None => encoded.into_owned(),
    }
}

/// File-backed cache of fetched payloads with a time-to-live.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl ResponseCache {
    /// Creates a cache rooted at `dir` with the default TTL.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Builder: set the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns the cache root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores a payload stamped with the current local time.
    pub fn write(&self, key: &CacheKey, payload: &[u8]) -> CacheResult<PathBuf> {
        self.write_at(key, payload, Local::now().naive_local())
    }

    /// Stores a payload stamped with `now`, then removes older files of the
    /// identity.
    pub fn write_at(
        &self,
        key: &CacheKey,
        payload: &[u8],
        now: NaiveDateTime,
    ) -> CacheResult<PathBuf> {
        let dir = self.key_dir(key);
        fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let file_name = key.file_name(now);
        let path = dir.join(&file_name);
        let tmp = dir.join(format!(".{}.{}.tmp", file_name, process::id()));

        fs::write(&tmp, payload).map_err(|e| CacheError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::io(&path, e));
        }
        debug!(key = %key, path = %path.display(), bytes = payload.len(), "Wrote cache file");

        self.cleanup(key)?;
        Ok(path)
    }

    /// Loads the newest payload of an identity.
    ///
    /// A file removed between listing and reading counts as a miss.
    pub fn load(&self, key: &CacheKey) -> CacheResult<Vec<u8>> {
        let Some((_, path)) = self.entries(key)?.into_iter().next() else {
            return Err(CacheError::Miss(key.to_string()));
        };
        match fs::read(&path) {
            Ok(payload) => {
                trace!(key = %key, path = %path.display(), "Loaded cache file");
                Ok(payload)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CacheError::Miss(key.to_string())),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    /// Returns true if the newest file of an identity is younger than the TTL.
    pub fn is_valid(&self, key: &CacheKey) -> bool {
        self.is_valid_at(key, Local::now().naive_local())
    }

    /// Like [`is_valid`](Self::is_valid), measured against `now`.
    ///
    /// `now` is truncated to the minute, matching the resolution of the
    /// file timestamps.
    pub fn is_valid_at(&self, key: &CacheKey, now: NaiveDateTime) -> bool {
        let newest = match self.entries(key) {
            Ok(entries) => entries.into_iter().next(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to list cache files");
                None
            }
        };
        let Some((written, _)) = newest else {
            return false;
        };

        let now = truncate_to_minute(now);
        let ttl = TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(written) < ttl
    }

    /// Deletes every file of an identity except the newest.
    ///
    /// Returns the number of removed files.
    pub fn cleanup(&self, key: &CacheKey) -> CacheResult<usize> {
        let mut removed = 0;
        for (_, path) in self.entries(key)?.iter().skip(1) {
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(path, e)),
            }
        }
        if removed > 0 {
            debug!(key = %key, removed, "Removed stale cache files");
        }
        Ok(removed)
    }

    fn key_dir(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.name())
    }

    /// Lists the files of an identity, newest first.
    fn entries(&self, key: &CacheKey) -> CacheResult<Vec<(NaiveDateTime, PathBuf)>> {
        let dir = self.key_dir(key);
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&dir, e)),
        };

        let prefix = key.prefix();
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CacheError::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(stamp) = file_name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
                continue;
            };
            match NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) {
                Ok(written) => entries.push((written, entry.path())),
                Err(_) => trace!(file = ?file_name, "Skipping unrelated cache file"),
            }
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries)
    }
}

fn truncate_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
        )
        .unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    mod keys {
        use super::*;

        #[test]
        fn file_name_layout() {
            let key = CacheKey::new("exams", &range());
            assert_eq!(
                key.file_name(at(10, 5, 0)),
                "exams-20250303-20250309-202503031005"
            );
        }

        #[test]
        fn names_are_path_safe() {
            assert_eq!(encode_name("individual-student-Anna_B"), "individual-student-Anna_B");
            assert_eq!(encode_name("individual-teacher-Müller"), "individual-teacher-M%C3%BCller");
            assert_eq!(encode_name("../etc/passwd"), "%2E.%2Fetc%2Fpasswd");
            assert_eq!(encode_name(".."), "%2E.");
            assert_eq!(encode_name(""), "%");
        }

        #[test]
        fn distinct_names_stay_distinct() {
            let names = ["A.B", "A B", "A_B", "A%20B", "A/B", "", "%", ".x", "%2Ex"];
            let encoded: std::collections::HashSet<_> =
                names.iter().map(|n| encode_name(n)).collect();
            assert_eq!(encoded.len(), names.len());
        }

        #[test]
        fn similar_names_use_separate_directories() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let dotted = CacheKey::new("individual-student-A.B", &range());
            let spaced = CacheKey::new("individual-student-A B", &range());

            cache.write_at(&dotted, b"dotted", at(8, 0, 0)).unwrap();
            cache.write_at(&spaced, b"spaced", at(8, 0, 0)).unwrap();

            assert_eq!(cache.load(&dotted).unwrap(), b"dotted");
            assert_eq!(cache.load(&spaced).unwrap(), b"spaced");
        }
    }

    mod read_write {
        use super::*;

        #[test]
        fn load_without_files_is_miss() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let err = cache.load(&CacheKey::new("exams", &range())).unwrap_err();
            assert!(err.is_miss());
        }

        #[test]
        fn write_then_load() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let key = CacheKey::new("calendar", &range());

            let path = cache.write_at(&key, b"[1,2,3]", at(8, 0, 0)).unwrap();
            assert_eq!(path.parent().unwrap(), tmp.path().join("calendar"));
            assert_eq!(cache.load(&key).unwrap(), b"[1,2,3]");
        }

        #[test]
        fn newest_file_wins_and_older_are_removed() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let key = CacheKey::new("exams", &range());

            cache.write_at(&key, b"old", at(8, 0, 0)).unwrap();
            cache.write_at(&key, b"new", at(9, 30, 0)).unwrap();

            assert_eq!(cache.load(&key).unwrap(), b"new");
            assert_eq!(
                files(&tmp.path().join("exams")),
                vec!["exams-20250303-20250309-202503030930"]
            );
        }

        #[test]
        fn rewrite_in_same_minute_replaces_file() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let key = CacheKey::new("exams", &range());

            cache.write_at(&key, b"first", at(8, 0, 10)).unwrap();
            cache.write_at(&key, b"second", at(8, 0, 50)).unwrap();

            assert_eq!(cache.load(&key).unwrap(), b"second");
            assert_eq!(files(&tmp.path().join("exams")).len(), 1);
        }

        #[test]
        fn ranges_do_not_share_files() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let week = CacheKey::new("exams", &range());
            let other = DateRange::new(range().start, range().start).unwrap();
            let day = CacheKey::new("exams", &other);

            cache.write_at(&week, b"week", at(8, 0, 0)).unwrap();
            cache.write_at(&day, b"day", at(9, 0, 0)).unwrap();

            assert_eq!(cache.load(&week).unwrap(), b"week");
            assert_eq!(cache.load(&day).unwrap(), b"day");
        }

        #[test]
        fn unrelated_files_are_ignored() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let key = CacheKey::new("exams", &range());
            let dir = tmp.path().join("exams");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("exams-20250303-20250309-garbage"), b"x").unwrap();
            fs::write(dir.join("notes.txt"), b"x").unwrap();

            assert!(cache.load(&key).unwrap_err().is_miss());
            cache.write_at(&key, b"ok", at(8, 0, 0)).unwrap();
            assert_eq!(files(&dir).len(), 3);
        }
    }

    mod validity {
        use super::*;

        #[test]
        fn missing_cache_is_invalid() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            assert!(!cache.is_valid(&CacheKey::new("timetable", &range())));
        }

        #[test]
        fn valid_within_ttl() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let key = CacheKey::new("timetable", &range());
            cache.write_at(&key, b"[]", at(10, 0, 30)).unwrap();

            assert!(cache.is_valid_at(&key, at(10, 0, 45)));
            assert!(cache.is_valid_at(&key, at(10, 59, 59)));
            assert!(!cache.is_valid_at(&key, at(11, 0, 0)));
            assert!(!cache.is_valid_at(&key, at(13, 0, 0)));
        }

        #[test]
        fn custom_ttl() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path()).with_ttl(Duration::from_secs(300));
            let key = CacheKey::new("timetable", &range());
            cache.write_at(&key, b"[]", at(10, 0, 0)).unwrap();

            assert!(cache.is_valid_at(&key, at(10, 4, 0)));
            assert!(!cache.is_valid_at(&key, at(10, 5, 0)));
        }

        #[test]
        fn written_now_is_valid() {
            let tmp = TempDir::new().unwrap();
            let cache = ResponseCache::new(tmp.path());
            let key = CacheKey::new("exams", &range());
            cache.write(&key, b"[]").unwrap();
            assert!(cache.is_valid(&key));
        }
    }

    #[test]
    fn defaults() {
        let cache = ResponseCache::default();
        assert_eq!(cache.dir(), Path::new("./tmp/cache"));
        assert_eq!(cache.ttl(), Duration::from_secs(3600));
    }
}
