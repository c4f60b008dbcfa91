use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Expiry configuration for a [`Resolver`](crate::Resolver).
///
/// Both durations are deserialized in humantime format, e.g. `1h` or `90s`:
///
/// ```
/// use keyflight::ResolverConfig;
///
/// let config: ResolverConfig =
///     serde_json::from_str(r#"{"time_to_live": "2h", "retry_misses_after": "30s"}"#).unwrap();
/// assert_eq!(config.time_to_live, std::time::Duration::from_secs(7200));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long a successfully resolved value stays fresh.
    ///
    /// Expiry is evaluated lazily on read; there is no background sweeper.
    #[serde(with = "humantime_serde")]
    pub time_to_live: Duration,

    /// How long a missing key is remembered before the upstream is retried.
    ///
    /// This window also suppresses retries after a failed lookup: any lookup
    /// error marks the key as missing for the full window. That conflates
    /// "confirmed absent" with "temporarily unreachable" and is kept for
    /// upstream load-shedding; a separate, shorter window for lookup errors
    /// would slot in here.
    #[serde(with = "humantime_serde")]
    pub retry_misses_after: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            time_to_live: Duration::from_secs(3600),
            retry_misses_after: Duration::from_secs(60),
        }
    }
}
