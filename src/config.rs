//! Run configuration for the feed client and the ranker.

use std::fmt;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Default base URL for the STM GTFS-RT API.
pub const DEFAULT_BASE_URL: &str = "https://api.stm.info/pub/od/gtfs-rt/ic/v2";

/// Environment variable consulted when no API key is passed explicitly.
pub const API_KEY_ENV: &str = "STM_API_KEY";

/// Environment variable naming the IANA zone used for clock times.
pub const TIMEZONE_ENV: &str = "TZ";

/// Zone used for clock times when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Toronto;

const DEFAULT_API_KEY_HEADER: &str = "apiKey";
const DEFAULT_TIMEOUT_SECS: u64 = 12;
const DEFAULT_LIMIT: usize = 3;
const DEFAULT_STALE_GRACE_SECS: u64 = 30;

/// Where and how to fetch the two realtime feeds.
#[derive(Clone)]
pub struct FeedConfig {
    /// Credential sent with every request
    pub api_key: String,
    /// Header field carrying the credential
    pub api_key_header: String,
    /// Prefix shared by both feeds
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    pub trip_updates_path: String,
    pub vehicle_positions_path: String,
}

impl FeedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            trip_updates_path: "tripUpdates".to_string(),
            vehicle_positions_path: "vehiclePositions".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn trip_updates_url(&self) -> String {
        self.join(&self.trip_updates_path)
    }

    pub fn vehicle_positions_url(&self) -> String {
        self.join(&self.vehicle_positions_path)
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("api_key", &"<redacted>")
            .field("api_key_header", &self.api_key_header)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("trip_updates_path", &self.trip_updates_path)
            .field("vehicle_positions_path", &self.vehicle_positions_path)
            .finish()
    }
}

/// Picks the credential: an explicit key wins over the environment. Blank
/// keys count as absent.
///
/// # Errors
///
/// Returns [`Error::MissingCredential`] when neither source has a key.
pub fn resolve_api_key(explicit: Option<String>, env: Option<String>) -> Result<String> {
    let usable = |key: &String| !key.trim().is_empty();
    explicit
        .filter(usable)
        .or_else(|| env.filter(usable))
        .ok_or(Error::MissingCredential {
            env_var: API_KEY_ENV,
        })
}

/// Picks the zone clock times are shown in.
///
/// An explicit name must be a valid IANA zone. A value from the environment
/// that does not parse (e.g. a POSIX `TZ` rule) is ignored in favor of
/// [`DEFAULT_TIMEZONE`].
///
/// # Errors
///
/// Returns [`Error::InvalidTimezone`] for an unknown explicit name.
pub fn resolve_timezone(explicit: Option<&str>, env: Option<&str>) -> Result<Tz> {
    if let Some(name) = explicit {
        return name
            .trim()
            .parse::<Tz>()
            .map_err(|_| Error::InvalidTimezone {
                name: name.to_string(),
            });
    }
    Ok(env
        .and_then(|name| name.trim().parse::<Tz>().ok())
        .unwrap_or(DEFAULT_TIMEZONE))
}

/// Ranking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankConfig {
    /// Maximum number of arrivals returned
    pub limit: usize,
    /// How far in the past a prediction may be and still be shown
    pub stale_grace: Duration,
}

impl RankConfig {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            stale_grace: Duration::from_secs(DEFAULT_STALE_GRACE_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_urls_join_base_and_paths() {
        let config = FeedConfig::new("k").with_base_url("http://localhost:8080/rt/");
        assert_eq!(config.trip_updates_url(), "http://localhost:8080/rt/tripUpdates");
        assert_eq!(
            config.vehicle_positions_url(),
            "http://localhost:8080/rt/vehiclePositions"
        );
    }

    #[test]
    fn test_defaults() {
        let config = FeedConfig::new("k");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.api_key_header, "apiKey");

        let rank = RankConfig::default();
        assert_eq!(rank.limit, 3);
        assert_eq!(rank.stale_grace, Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = FeedConfig::new("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn test_explicit_api_key_wins_over_env() {
        let key = resolve_api_key(Some("cli".into()), Some("env".into())).unwrap();
        assert_eq!(key, "cli");
    }

    #[test]
    fn test_env_api_key_used_when_no_explicit_key() {
        assert_eq!(resolve_api_key(None, Some("env".into())).unwrap(), "env");
        assert_eq!(
            resolve_api_key(Some("   ".into()), Some("env".into())).unwrap(),
            "env"
        );
    }

    #[test]
    fn test_blank_or_absent_api_key_is_missing_credential() {
        for (explicit, env) in [
            (None, None),
            (Some(String::new()), None),
            (None, Some(" \t".to_string())),
            (Some(" ".to_string()), Some(String::new())),
        ] {
            let err = resolve_api_key(explicit, env).unwrap_err();
            assert!(matches!(err, Error::MissingCredential { env_var } if env_var == API_KEY_ENV));
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn test_timezone_resolution() {
        assert_eq!(
            resolve_timezone(Some("America/Vancouver"), Some("UTC")).unwrap(),
            chrono_tz::America::Vancouver
        );
        assert_eq!(resolve_timezone(None, Some("UTC")).unwrap(), chrono_tz::UTC);
        assert_eq!(
            resolve_timezone(None, Some(":/etc/localtime")).unwrap(),
            DEFAULT_TIMEZONE
        );
        assert_eq!(resolve_timezone(None, None).unwrap(), DEFAULT_TIMEZONE);

        let err = resolve_timezone(Some("Mars/Olympus"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidTimezone { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
