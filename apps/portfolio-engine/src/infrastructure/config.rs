//! Runtime configuration.
//!
//! All knobs come from environment variables with sensible defaults, so the
//! binary runs with no configuration at all.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Settings for the order publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Events read from the log per poll.
    pub batch_size: usize,
    /// Sleep between polls when the log is caught up.
    pub poll_interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-quote deadline during valuation.
    pub quote_timeout: Duration,
    /// Order publisher settings.
    pub publisher: PublisherConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(1),
            publisher: PublisherConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment.
    ///
    /// Unset variables fall back to defaults; unparsable values are logged
    /// and replaced by defaults rather than aborting startup.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quote_timeout: Duration::from_millis(parse_env(
                "QUOTE_TIMEOUT_MS",
                defaults.quote_timeout.as_millis() as u64,
            )),
            publisher: PublisherConfig {
                batch_size: parse_env("PUBLISHER_BATCH_SIZE", defaults.publisher.batch_size),
                poll_interval: Duration::from_millis(parse_env(
                    "PUBLISHER_POLL_INTERVAL_MS",
                    defaults.publisher.poll_interval.as_millis() as u64,
                )),
            },
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = raw, "unparsable configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}
