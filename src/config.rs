//! Application configuration.
//!
//! Built once at startup and handed to each component by reference. Values come
//! from defaults, overridden by `HANZI_DAILY_*` environment variables.

use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::repository::RetentionPolicy;

pub const ENV_PREFIX: &str = "HANZI_DAILY_";
pub const API_KEY_VAR: &str = "HANZI_DAILY_API_KEY";

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: 1200,
            temperature: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub pack_size: usize,
    pub history_window_days: u32,
    pub retention: RetentionPolicy,
    /// Upper bound the app puts on one refresh. The provider itself has none.
    pub refresh_timeout: Option<Duration>,
    pub remote: RemoteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            pack_size: crate::db::PACK_SIZE,
            history_window_days: 30,
            retention: RetentionPolicy::KeepAll,
            refresh_timeout: Some(Duration::from_secs(45)),
            remote: RemoteConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps full variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = get("BASE_URL") {
            config.remote.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("MODEL") {
            config.remote.model = model;
        }
        if let Some(raw) = get("MAX_TOKENS") {
            config.remote.max_tokens = parse_var("MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = get("TEMPERATURE") {
            config.remote.temperature = parse_var("TEMPERATURE", &raw)?;
        }
        if let Some(raw) = get("HISTORY_DAYS") {
            config.history_window_days = parse_var("HISTORY_DAYS", &raw)?;
        }
        if let Some(raw) = get("REFRESH_TIMEOUT_SECS") {
            let secs: u64 = parse_var("REFRESH_TIMEOUT_SECS", &raw)?;
            config.refresh_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(raw) = get("RETENTION_DAYS") {
            let days: u32 = parse_var("RETENTION_DAYS", &raw)?;
            let keep_favorites = match get("KEEP_FAVORITES") {
                Some(flag) => parse_flag(&flag)?,
                None => true,
            };
            config.retention = if days == 0 {
                RetentionPolicy::KeepAll
            } else {
                RetentionPolicy::MaxAgeDays {
                    days,
                    keep_favorites,
                }
            };
        }

        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("hanzi-daily.sqlite3")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hanzi-daily")
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| format!("invalid value for {ENV_PREFIX}{name}: '{raw}'"))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other if other.eq_ignore_ascii_case("true") => Ok(true),
        other if other.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(anyhow!("invalid boolean '{other}'")),
    }
}

/// Source of the bearer credential for the remote provider.
pub trait CredentialProvider: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Reads the key from `HANZI_DAILY_API_KEY` on every call.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_VAR)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Option<String>);

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.pack_size, 5);
        assert_eq!(config.history_window_days, 30);
        assert_eq!(config.retention, RetentionPolicy::KeepAll);
        assert_eq!(config.remote, RemoteConfig::default());
    }

    #[test]
    fn applies_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATA_DIR", "/tmp/hd"),
            ("BASE_URL", "http://localhost:8080/v1/"),
            ("TEMPERATURE", "0.2"),
            ("RETENTION_DAYS", "90"),
            ("KEEP_FAVORITES", "false"),
            ("REFRESH_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/tmp/hd/hanzi-daily.sqlite3"));
        assert_eq!(config.remote.base_url, "http://localhost:8080/v1");
        assert!((config.remote.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(
            config.retention,
            RetentionPolicy::MaxAgeDays {
                days: 90,
                keep_favorites: false
            }
        );
        assert_eq!(config.refresh_timeout, None);
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = AppConfig::from_lookup(lookup(&[("MAX_TOKENS", "lots")])).unwrap_err();
        assert!(format!("{err:#}").contains("HANZI_DAILY_MAX_TOKENS"));
    }

    #[test]
    fn static_credentials_return_configured_key() {
        assert_eq!(StaticCredentials(Some("k".into())).api_key().as_deref(), Some("k"));
        assert_eq!(StaticCredentials(None).api_key(), None);
    }
}
