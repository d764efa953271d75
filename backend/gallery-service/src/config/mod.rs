use crate::sampler::SamplerConfig;
use redis_utils::RedisEndpoint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    pub app: AppConfig,
    pub redis: RedisConfig,
    pub sampler: SamplerSettings,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("expected json or pretty, got {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Full connection URL; wins over host/port/db when set
    #[serde(default)]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: i64,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    /// Key prefix shared by every viewed set
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerSettings {
    pub max_id: u64,
    pub page_size: usize,
    pub recent_capacity: usize,
    pub draw_budget: u32,
    pub source_timeout_ms: u64,
    pub picture_cache_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub path: PathBuf,
}

impl GalleryConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; unset variables take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = GalleryConfig {
            app: AppConfig {
                env: var("APP_ENV", "development"),
                log_level: var("LOG_LEVEL", "info"),
                log_format: parse(&lookup, "LOG_FORMAT", LogFormat::Json)?,
            },
            redis: RedisConfig {
                url: non_empty("REDIS_URL"),
                host: var("REDIS_HOST", "127.0.0.1"),
                port: parse(&lookup, "REDIS_PORT", 12710)?,
                db: parse(&lookup, "REDIS_DB", 0)?,
                password: non_empty("REDIS_PASSWORD"),
                namespace: non_empty("REDIS_NAMESPACE"),
                timeout_ms: parse(&lookup, "GALLERY_STORE_TIMEOUT_MS", default_store_timeout_ms())?,
            },
            sampler: SamplerSettings {
                max_id: parse(&lookup, "GALLERY_MAX_ID", 5_000_000)?,
                page_size: parse(&lookup, "GALLERY_PAGE_SIZE", 200)?,
                recent_capacity: parse(
                    &lookup,
                    "GALLERY_RECENT_CAPACITY",
                    gallery_cache::DEFAULT_RECENT_CAPACITY,
                )?,
                draw_budget: parse(&lookup, "GALLERY_DRAW_BUDGET", 300)?,
                source_timeout_ms: parse(&lookup, "GALLERY_SOURCE_TIMEOUT_MS", 5000)?,
                picture_cache_size: parse(&lookup, "GALLERY_PICTURE_CACHE_SIZE", 1024)?,
            },
            snapshot: SnapshotConfig {
                path: PathBuf::from(var("GALLERY_SNAPSHOT_PATH", "recent_id_cache.json")),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sampler = &self.sampler;
        let checks = [
            ("GALLERY_MAX_ID", sampler.max_id == 0),
            ("GALLERY_PAGE_SIZE", sampler.page_size == 0),
            ("GALLERY_RECENT_CAPACITY", sampler.recent_capacity == 0),
            ("GALLERY_DRAW_BUDGET", sampler.draw_budget == 0),
            ("GALLERY_SOURCE_TIMEOUT_MS", sampler.source_timeout_ms == 0),
            ("GALLERY_STORE_TIMEOUT_MS", self.redis.timeout_ms == 0),
        ];
        match checks.into_iter().find(|(_, zero)| *zero) {
            Some((name, _)) => Err(ConfigError::Zero(name)),
            None => Ok(()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            max_id: self.sampler.max_id,
            page_size: self.sampler.page_size,
            draw_budget: self.sampler.draw_budget,
            source: resilience::content_source_config()
                .with_timeout(Duration::from_millis(self.sampler.source_timeout_ms)),
            store_retry: resilience::redis_config().retry,
            seed: None,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.redis.timeout_ms)
    }

    pub fn redis_endpoint(&self) -> RedisEndpoint {
        let mut endpoint = RedisEndpoint::new(self.redis.host.clone(), self.redis.port);
        endpoint.db = self.redis.db;
        endpoint.password = self.redis.password.clone();
        endpoint
    }
}

fn parse<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn default_store_timeout_ms() -> u64 {
    resilience::redis_config().timeout.duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<GalleryConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GalleryConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.log_format, LogFormat::Json);
        assert_eq!(config.redis.url, None);
        assert_eq!(config.redis.port, 12710);
        assert_eq!(config.sampler.max_id, 5_000_000);
        assert_eq!(config.sampler.recent_capacity, 6);
        assert_eq!(config.snapshot.path, PathBuf::from("recent_id_cache.json"));
        assert_eq!(config.store_timeout(), resilience::redis_config().timeout.duration);
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("APP_ENV", "production"),
            ("LOG_FORMAT", "pretty"),
            ("REDIS_URL", "redis://cache:6379/2"),
            ("REDIS_NAMESPACE", "staging"),
            ("GALLERY_MAX_ID", "42"),
            ("GALLERY_SOURCE_TIMEOUT_MS", "250"),
        ])
        .unwrap();

        assert!(config.is_production());
        assert_eq!(config.app.log_format, LogFormat::Pretty);
        assert_eq!(config.redis.url.as_deref(), Some("redis://cache:6379/2"));
        assert_eq!(config.redis.namespace.as_deref(), Some("staging"));

        let sampler = config.sampler_config();
        assert_eq!(sampler.max_id, 42);
        assert_eq!(sampler.source.timeout.duration, Duration::from_millis(250));
    }

    #[test]
    fn test_blank_url_falls_back_to_endpoint() {
        let config = config_from(&[("REDIS_URL", "  "), ("REDIS_DB", "3")]).unwrap();
        assert_eq!(config.redis.url, None);
        assert_eq!(config.redis_endpoint().label(), "127.0.0.1:12710/3");
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let err = config_from(&[("GALLERY_PAGE_SIZE", "lots")]).unwrap_err();
        assert!(err.to_string().contains("GALLERY_PAGE_SIZE"));
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = config_from(&[("GALLERY_DRAW_BUDGET", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("GALLERY_DRAW_BUDGET")));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(config_from(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
