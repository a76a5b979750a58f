use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::volume::Volume;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("{0}")]
    OutOfRange(&'static str),
}

/// Limits applied to every playback session.
#[derive(Debug, Clone, Copy)]
pub struct MusicConfig {
    pub max_queue_size: usize,
    pub default_volume: Volume,
    pub max_volume: Volume,
    pub leave_timeout: Duration,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 50,
            default_volume: Volume::default(),
            max_volume: Volume::MAX,
            leave_timeout: Duration::from_secs(5 * 60),
        }
    }
}

pub struct Config {
    pub discord_token: String,
    pub youtube_api_key: String,
    pub log_level: String,
    pub music: MusicConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let defaults = MusicConfig::default();
        let max_queue_size = parse_or(&lookup, "MAX_QUEUE_SIZE", defaults.max_queue_size)?;
        let max_volume: i64 = parse_or(&lookup, "MAX_VOLUME", 100)?;
        let default_volume: i64 = parse_or(&lookup, "DEFAULT_VOLUME", 50)?;
        let leave_timeout_secs: u64 = parse_or(
            &lookup,
            "LEAVE_TIMEOUT_SECS",
            defaults.leave_timeout.as_secs(),
        )?;

        if max_queue_size == 0 {
            return Err(ConfigError::OutOfRange("MAX_QUEUE_SIZE must be greater than 0"));
        }
        if !(0..=100).contains(&max_volume) {
            return Err(ConfigError::OutOfRange("MAX_VOLUME must be between 0 and 100"));
        }
        if !(0..=max_volume).contains(&default_volume) {
            return Err(ConfigError::OutOfRange(
                "DEFAULT_VOLUME must be between 0 and MAX_VOLUME",
            ));
        }
        if leave_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "LEAVE_TIMEOUT_SECS must be greater than 0",
            ));
        }

        let max_volume = Volume::clamped(max_volume, Volume::MAX);

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            youtube_api_key: required("YOUTUBE_API_KEY")?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            music: MusicConfig {
                max_queue_size,
                default_volume: Volume::clamped(default_volume, max_volume),
                max_volume,
                leave_timeout: Duration::from_secs(leave_timeout_secs),
            },
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: [(&str, &str); 2] = [("DISCORD_TOKEN", "token"), ("YOUTUBE_API_KEY", "key")];

    #[test]
    fn applies_defaults() {
        let config = load(&BASE).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.music.max_queue_size, 50);
        assert_eq!(config.music.default_volume.percent(), 50);
        assert_eq!(config.music.max_volume.percent(), 100);
        assert_eq!(config.music.leave_timeout, Duration::from_secs(300));
    }

    #[test]
    fn reads_overrides() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("MAX_QUEUE_SIZE", "10"),
            ("DEFAULT_VOLUME", "30"),
            ("MAX_VOLUME", "80"),
            ("LEAVE_TIMEOUT_SECS", "60"),
            ("LOG_LEVEL", "debug"),
        ]);
        let config = load(&pairs).unwrap();
        assert_eq!(config.music.max_queue_size, 10);
        assert_eq!(config.music.default_volume.percent(), 30);
        assert_eq!(config.music.max_volume.percent(), 80);
        assert_eq!(config.music.leave_timeout, Duration::from_secs(60));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = load(&[("YOUTUBE_API_KEY", "key")]).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("DISCORD_TOKEN")));
    }

    #[test]
    fn rejects_malformed_and_out_of_range_values() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_QUEUE_SIZE", "lots"));
        assert!(matches!(
            load(&pairs).err().unwrap(),
            ConfigError::Invalid { key: "MAX_QUEUE_SIZE", .. }
        ));

        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_VOLUME", "150"));
        assert!(matches!(load(&pairs).err().unwrap(), ConfigError::OutOfRange(_)));

        let mut pairs = BASE.to_vec();
        pairs.extend([("MAX_VOLUME", "40"), ("DEFAULT_VOLUME", "60")]);
        assert!(matches!(load(&pairs).err().unwrap(), ConfigError::OutOfRange(_)));
    }
}
