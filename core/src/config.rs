//! Environment-tunable sync settings.

const DEFAULT_INITIAL_LOOKBACK_DAYS: i64 = 365;
const DEFAULT_SYNC_CHUNK_DAYS: i64 = 90;
const DEFAULT_DAY_SYNC_LIMIT: u32 = 1000;
const DEFAULT_YESTERDAY_REFRESH_MINUTES: i64 = 180;

/// Tuning knobs for the sync planner and day-sync orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncConfig {
    /// How far back a first sync reaches (days).
    pub initial_lookback_days: i64,
    /// Maximum span of one fetch chunk (days).
    pub sync_chunk_days: i64,
    /// Page size for day-sync pagination.
    pub day_sync_limit: u32,
    /// How long yesterday's complete record stays a cache hit (minutes).
    pub yesterday_refresh_minutes: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            initial_lookback_days: DEFAULT_INITIAL_LOOKBACK_DAYS,
            sync_chunk_days: DEFAULT_SYNC_CHUNK_DAYS,
            day_sync_limit: DEFAULT_DAY_SYNC_LIMIT,
            yesterday_refresh_minutes: DEFAULT_YESTERDAY_REFRESH_MINUTES,
        }
    }
}

impl SyncConfig {
    /// Read the tuning variables from the environment.
    ///
    /// Unset, unparseable or non-positive values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = SyncConfig::default();
        SyncConfig {
            initial_lookback_days: read_positive(
                &lookup,
                "PROJECTX_INITIAL_LOOKBACK_DAYS",
                defaults.initial_lookback_days,
            ),
            sync_chunk_days: read_positive(
                &lookup,
                "PROJECTX_SYNC_CHUNK_DAYS",
                defaults.sync_chunk_days,
            ),
            day_sync_limit: read_positive(&lookup, "PROJECTX_DAY_SYNC_LIMIT", i64::from(defaults.day_sync_limit))
                .try_into()
                .unwrap_or(defaults.day_sync_limit),
            yesterday_refresh_minutes: read_positive(
                &lookup,
                "PROJECTX_YESTERDAY_REFRESH_MINUTES",
                defaults.yesterday_refresh_minutes,
            ),
        }
    }
}

fn read_positive(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: i64) -> i64 {
    lookup(name)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = SyncConfig::default();
        assert_eq!(config.initial_lookback_days, 365);
        assert_eq!(config.sync_chunk_days, 90);
        assert_eq!(config.day_sync_limit, 1000);
        assert_eq!(config.yesterday_refresh_minutes, 180);
    }

    #[test]
    fn env_overrides_apply_when_positive() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("PROJECTX_INITIAL_LOOKBACK_DAYS", "30"),
            ("PROJECTX_SYNC_CHUNK_DAYS", "7"),
            ("PROJECTX_DAY_SYNC_LIMIT", "250"),
            ("PROJECTX_YESTERDAY_REFRESH_MINUTES", "60"),
        ]));
        assert_eq!(config.initial_lookback_days, 30);
        assert_eq!(config.sync_chunk_days, 7);
        assert_eq!(config.day_sync_limit, 250);
        assert_eq!(config.yesterday_refresh_minutes, 60);
    }

    #[test]
    fn invalid_overrides_fall_back_to_defaults() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("PROJECTX_INITIAL_LOOKBACK_DAYS", "-5"),
            ("PROJECTX_SYNC_CHUNK_DAYS", "ninety"),
            ("PROJECTX_DAY_SYNC_LIMIT", "0"),
        ]));
        assert_eq!(config, SyncConfig::default());
    }
}
