use std::time::Duration;

use crate::error::ConfigError;
use crate::models::Settings;
use crate::state::matchmaking::{QueueConfig, DEFAULT_QUEUE_STALE_AFTER, DEFAULT_QUEUE_TTL};
use crate::state::registry::{RegistryConfig, DEFAULT_ABANDON_AFTER, DEFAULT_FINISHED_RETENTION};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Process configuration, read from `CHESS_*` environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub sweep_interval: Duration,
    pub queue_cleanup_interval: Duration,
    pub registry: RegistryConfig,
    pub queue: QueueConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            sweep_interval: Duration::from_secs(60),
            queue_cleanup_interval: Duration::from_secs(30),
            registry: RegistryConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key/value source; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let secs = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(Duration::from_secs(positive(key, lookup(key), default.as_secs())?))
        };

        let bind_addr = match lookup("CHESS_BIND_ADDR") {
            Some(addr) if addr.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    key: "CHESS_BIND_ADDR".to_string(),
                })
            }
            Some(addr) => addr.trim().to_string(),
            None => defaults.bind_addr,
        };

        let default_settings = Settings {
            max_moves_per_period: positive(
                "CHESS_DEFAULT_MAX_MOVES",
                lookup("CHESS_DEFAULT_MAX_MOVES"),
                u64::from(defaults.registry.default_settings.max_moves_per_period),
            )? as u32,
            piece_cooldown_seconds: positive(
                "CHESS_DEFAULT_COOLDOWN_SECS",
                lookup("CHESS_DEFAULT_COOLDOWN_SECS"),
                u64::from(defaults.registry.default_settings.piece_cooldown_seconds),
            )? as u32,
        };

        let ttl = secs("CHESS_QUEUE_TTL_SECS", DEFAULT_QUEUE_TTL)?;
        let stale_after = secs("CHESS_QUEUE_STALE_SECS", DEFAULT_QUEUE_STALE_AFTER)?.min(ttl);

        Ok(Config {
            bind_addr,
            sweep_interval: secs("CHESS_SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
            queue_cleanup_interval: secs(
                "CHESS_QUEUE_CLEANUP_SECS",
                defaults.queue_cleanup_interval,
            )?,
            registry: RegistryConfig {
                abandon_after: secs("CHESS_ABANDON_AFTER_SECS", DEFAULT_ABANDON_AFTER)?,
                finished_retention: secs(
                    "CHESS_FINISHED_RETENTION_SECS",
                    DEFAULT_FINISHED_RETENTION,
                )?,
                default_settings,
            },
            queue: QueueConfig { ttl, stale_after },
        })
    }
}

fn positive(key: &str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 && n <= u64::from(u32::MAX) => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CHESS_BIND_ADDR", "0.0.0.0:9000"),
            ("CHESS_DEFAULT_MAX_MOVES", "8"),
            ("CHESS_ABANDON_AFTER_SECS", "45"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.registry.default_settings.max_moves_per_period, 8);
        assert_eq!(config.registry.abandon_after, Duration::from_secs(45));
    }

    #[test]
    fn staleness_never_exceeds_ttl() {
        let config = Config::from_lookup(lookup(&[
            ("CHESS_QUEUE_TTL_SECS", "60"),
            ("CHESS_QUEUE_STALE_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.queue.stale_after, Duration::from_secs(60));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("CHESS_DEFAULT_COOLDOWN_SECS", "0")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(Config::from_lookup(lookup(&[("CHESS_SWEEP_INTERVAL_SECS", "soon")])).is_err());
        assert!(matches!(
            Config::from_lookup(lookup(&[("CHESS_BIND_ADDR", " ")])),
            Err(ConfigError::Empty { .. })
        ));
    }
}
