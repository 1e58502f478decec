//! Configuration management for nestlock
//!
//! Holds everything a [`Registry`](crate::Registry) needs at construction:
//! the store namespace, lock behaviour, codec selection, facade mode and
//! logging. Loaded from TOML with environment overrides, then validated.

use crate::core::error::{Error, Result};
use crate::{log_info, log_warn};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Lock configuration
    pub lock: LockConfig,

    /// Codec configuration
    pub codec: CodecConfig,

    /// Caller-facing facade configuration
    pub facade: FacadeConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Hash name holding every root document of this instance
    pub namespace: String,
}

/// Lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Take a distributed lock around every mutation
    pub enabled: bool,

    /// Lease time of an acquired lock
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub ttl: Duration,

    /// Extra acquire attempts after the first one fails
    pub retry_count: u32,

    /// Base pause between acquire attempts
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub retry_delay: Duration,

    /// Upper bound of the random pause added to `retry_delay`
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub retry_jitter: Duration,

    /// Fraction of the ttl reserved for clock drift between lock services
    pub drift_factor: f64,

    /// Names of the lock services to reach quorum across.
    /// Empty means the lock service shared by every registry of this process.
    pub endpoints: Vec<String>,
}

/// Serialization format of stored documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecFormat {
    /// JSON text
    Json,
    /// YAML text
    Yaml,
    /// MessagePack binary
    #[serde(alias = "messagepack")]
    Msgpack,
}

/// Codec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Format used to encode stored documents
    pub format: CodecFormat,
}

/// How callers observe completion of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacadeMode {
    /// Operations return futures
    Async,
    /// Operations block the calling thread until they settle
    Blocking,
}

/// Facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Facade mode
    pub mode: FacadeMode,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "nestlock".to_string(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(10),
            retry_count: 10,
            retry_delay: Duration::from_millis(200),
            retry_jitter: Duration::from_millis(100),
            drift_factor: 0.01,
            endpoints: Vec::new(),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            format: CodecFormat::Json,
        }
    }
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            mode: FacadeMode::Async,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, apply environment
    /// overrides and validate the result
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        use std::env;

        if let Ok(namespace) = env::var("NESTLOCK_NAMESPACE") {
            self.store.namespace = namespace;
        }

        if let Ok(enabled) = env::var("NESTLOCK_LOCK_ENABLED") {
            self.lock.enabled = enabled
                .parse()
                .map_err(|e| Error::config(format!("Invalid lock toggle: {}", e)))?;
        }

        if let Ok(ttl) = env::var("NESTLOCK_LOCK_TTL") {
            self.lock.ttl = parse_duration(&ttl)
                .map_err(|e| Error::config(format!("Invalid lock ttl: {}", e)))?;
        }

        if let Ok(format) = env::var("NESTLOCK_CODEC") {
            self.codec.format = match format.as_str() {
                "json" => CodecFormat::Json,
                "yaml" => CodecFormat::Yaml,
                "msgpack" | "messagepack" => CodecFormat::Msgpack,
                other => return Err(Error::config(format!("Invalid codec: {}", other))),
            };
        }

        if let Ok(mode) = env::var("NESTLOCK_MODE") {
            self.facade.mode = match mode.as_str() {
                "async" => FacadeMode::Async,
                "blocking" => FacadeMode::Blocking,
                other => return Err(Error::config(format!("Invalid facade mode: {}", other))),
            };
        }

        if let Ok(level) = env::var("NESTLOCK_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.store.namespace.is_empty() {
            return Err(Error::config("Store namespace must not be empty"));
        }

        if self.lock.ttl.is_zero() {
            return Err(Error::config("Lock ttl must be greater than zero"));
        }

        if !(0.0..1.0).contains(&self.lock.drift_factor) {
            return Err(Error::config("Lock drift factor must be in [0, 1)"));
        }

        for (i, name) in self.lock.endpoints.iter().enumerate() {
            if self.lock.endpoints[i + 1..].contains(name) {
                return Err(Error::config(format!("Duplicate lock endpoint: {}", name)));
            }
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => return Err(Error::config("Invalid log level")),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => return Err(Error::config("Invalid log format")),
        }

        Ok(())
    }
}

/// Load configuration from file or use defaults
pub fn load_config_or_default(path: Option<&str>) -> Config {
    match Config::load(path) {
        Ok(config) => {
            log_info!("Loaded configuration from: {}", path.unwrap_or("<defaults>"));
            config
        }
        Err(e) => {
            log_warn!("Failed to load config from {:?}: {}. Using defaults.", path, e);
            Config::default()
        }
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}

// Custom deserializer for Duration from string
fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration string like '30s' or '5m', or milliseconds")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            parse_duration(value).map_err(E::custom)
        }

        fn visit_u64<E>(self, value: u64) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(value))
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<Duration, E>
        where
            E: de::Error,
        {
            u64::try_from(value)
                .map(Duration::from_millis)
                .map_err(|_| E::custom("duration must not be negative"))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

// Simple duration parser for common formats
fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let ms: u64 = ms.parse().map_err(|_| "Invalid milliseconds")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(secs) = s.strip_suffix('s') {
        let secs: u64 = secs.parse().map_err(|_| "Invalid seconds")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.parse().map_err(|_| "Invalid minutes")?;
        let secs = mins.checked_mul(60).ok_or("Invalid minutes")?;
        Ok(Duration::from_secs(secs))
    } else if let Some(hours) = s.strip_suffix('h') {
        let hours: u64 = hours.parse().map_err(|_| "Invalid hours")?;
        let secs = hours.checked_mul(3600).ok_or("Invalid hours")?;
        Ok(Duration::from_secs(secs))
    } else {
        // Bare numbers are milliseconds, matching the lock service convention
        let ms: u64 = s.parse().map_err(|_| "Invalid duration format")?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(config.lock.enabled);
        assert_eq!(config.lock.ttl, Duration::from_secs(10));
        assert_eq!(config.codec.format, CodecFormat::Json);
        assert_eq!(config.facade.mode, FacadeMode::Async);
    }

    #[test]
    fn test_parse_duration_formats() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1500").unwrap(), Duration::from_millis(1500));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
        assert!(parse_duration(&format!("{}h", u64::MAX / 60)).is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [lock]
            enabled = false
            ttl = "500ms"

            [codec]
            format = "yaml"
            "#,
        )
        .unwrap();

        assert!(!config.lock.enabled);
        assert_eq!(config.lock.ttl, Duration::from_millis(500));
        assert_eq!(config.lock.retry_count, 10);
        assert_eq!(config.codec.format, CodecFormat::Yaml);
        assert_eq!(config.store.namespace, "nestlock");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nnamespace = \"documents\"\n[facade]\nmode = \"blocking\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.store.namespace, "documents");
        assert_eq!(config.facade.mode, FacadeMode::Blocking);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.store.namespace.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lock.ttl = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lock.drift_factor = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.lock.endpoints = vec!["a".into(), "b".into(), "a".into()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.lock.retry_delay, config.lock.retry_delay);
        assert_eq!(back.store.namespace, config.store.namespace);
    }
}
