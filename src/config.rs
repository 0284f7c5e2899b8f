//! Configuration for hit fetching.
//!
//! The ceilings and thread limits are supplied by the application; a copy is
//! taken when a search starts, so changing a config only affects searches
//! started afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::abort::CancellationToken;
use crate::error::{HitstreamError, Result};

/// Number of threads that turned out to be enough for fetching hits.
///
/// Fetching is cheap compared to sorting and grouping, so more threads mostly
/// contend on the orchestration lock and the collector.
pub const IDEAL_NUM_THREADS_FETCHING: usize = 4;

/// Default minimum number of extra hits to fetch per `ensure_results_read` call.
pub const DEFAULT_FETCH_HITS_MIN: u64 = 20;

/// Default interval at which a waiting caller re-checks progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Limits and tuning for fetching the hits of one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of hits to store. `None` means unlimited.
    pub max_hits_to_process: Option<u64>,

    /// Maximum number of hits to count. `None` means unlimited.
    pub max_hits_to_count: Option<u64>,

    /// Maximum number of threads a single search may use.
    pub max_threads_per_search: usize,

    /// How often a caller waiting for the orchestration lock checks whether
    /// its own request has already been satisfied.
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Each request is padded by this many hits so that iterating over
    /// results does not take the orchestration lock once per hit.
    pub fetch_hits_min: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_hits_to_process: None,
            max_hits_to_count: None,
            max_threads_per_search: num_cpus::get(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_hits_min: DEFAULT_FETCH_HITS_MIN,
        }
    }
}

impl FetchConfig {
    /// Create a config with the given ceilings and default tuning.
    pub fn new(max_hits_to_process: Option<u64>, max_hits_to_count: Option<u64>) -> Self {
        Self {
            max_hits_to_process,
            max_hits_to_count,
            ..Default::default()
        }
    }

    /// Parse a config from JSON. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: FetchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the maximum number of hits to store.
    pub fn with_max_hits_to_process(mut self, max: Option<u64>) -> Self {
        self.max_hits_to_process = max;
        self
    }

    /// Set the maximum number of hits to count.
    pub fn with_max_hits_to_count(mut self, max: Option<u64>) -> Self {
        self.max_hits_to_count = max;
        self
    }

    /// Set the maximum number of threads per search.
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads_per_search = threads;
        self
    }

    /// Set the lock polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the request padding.
    pub fn with_fetch_hits_min(mut self, min: u64) -> Self {
        self.fetch_hits_min = min;
        self
    }

    /// Check that the values are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_threads_per_search == 0 {
            return Err(HitstreamError::invalid_config(
                "max_threads_per_search must be at least 1",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(HitstreamError::invalid_config(
                "poll_interval must be greater than zero",
            ));
        }
        if self.process_limit() > self.count_limit() {
            return Err(HitstreamError::invalid_config(format!(
                "max_hits_to_process ({}) exceeds max_hits_to_count ({})",
                self.process_limit(),
                self.count_limit()
            )));
        }
        Ok(())
    }

    /// Processing ceiling, with unlimited mapped to `u64::MAX`.
    pub fn process_limit(&self) -> u64 {
        self.max_hits_to_process.unwrap_or(u64::MAX)
    }

    /// Counting ceiling, with unlimited mapped to `u64::MAX`.
    pub fn count_limit(&self) -> u64 {
        self.max_hits_to_count.unwrap_or(u64::MAX)
    }

    /// Number of fetch threads for one search.
    pub fn fetch_threads(&self) -> usize {
        IDEAL_NUM_THREADS_FETCHING.min(self.max_threads_per_search).max(1)
    }
}

/// Per-search settings: the fetch limits plus an optional cancellation token.
#[derive(Debug, Clone, Default)]
pub struct SearchSettings {
    /// Ceilings and tuning.
    pub fetch: FetchConfig,

    /// Token used to abort the search from another thread.
    pub cancellation: Option<CancellationToken>,
}

impl SearchSettings {
    /// Create settings from a fetch config.
    pub fn new(fetch: FetchConfig) -> Self {
        Self {
            fetch,
            cancellation: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.max_hits_to_process, None);
        assert_eq!(config.max_hits_to_count, None);
        assert!(config.max_threads_per_search > 0);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.fetch_hits_min, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = FetchConfig::new(Some(10), Some(100))
            .with_max_threads(2)
            .with_poll_interval(Duration::from_millis(5))
            .with_fetch_hits_min(0);

        assert_eq!(config.process_limit(), 10);
        assert_eq!(config.count_limit(), 100);
        assert_eq!(config.fetch_threads(), 2);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.fetch_hits_min, 0);
    }

    #[test]
    fn test_fetch_threads_capped() {
        let config = FetchConfig::default().with_max_threads(64);
        assert_eq!(config.fetch_threads(), IDEAL_NUM_THREADS_FETCHING);
    }

    #[test]
    fn test_validate_rejects_process_above_count() {
        let config = FetchConfig::new(Some(100), Some(10));
        assert!(matches!(
            config.validate(),
            Err(HitstreamError::InvalidConfig(_))
        ));

        let config = FetchConfig::new(None, Some(10));
        assert!(config.validate().is_err());

        let config = FetchConfig::default().with_max_threads(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let config = FetchConfig::from_json_str(
            r#"{"max_hits_to_process": 1000, "max_hits_to_count": 5000, "poll_interval": 10}"#,
        )
        .unwrap();
        assert_eq!(config.max_hits_to_process, Some(1000));
        assert_eq!(config.max_hits_to_count, Some(5000));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.fetch_hits_min, DEFAULT_FETCH_HITS_MIN);

        let json = serde_json::to_string(&config).unwrap();
        let parsed = FetchConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_invalid_config_rejected() {
        let result = FetchConfig::from_json_str(r#"{"max_hits_to_process": 5, "max_hits_to_count": 1}"#);
        assert!(result.is_err());
    }
}
