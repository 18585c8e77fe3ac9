//! Config - 環境変数からの設定読み込み
//!
//! `.env` があれば先に読み込み（dotenv）、その後で環境変数を参照する。
//! API キー以外はすべて既定値を持つ。

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{ImageQuality, ImageSettings, ImageSize};

pub const DEFAULT_CACHE_DIR: &str = "image_cache";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub cache_dir: PathBuf,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub provider_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub image_model: String,
    pub image_size: ImageSize,
    pub image_quality: ImageQuality,
}

impl Default for Config {
    fn default() -> Self {
        let settings = ImageSettings::default();
        Self {
            openai_api_key: None,
            openai_base_url: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            rate_limit_requests: 10,
            rate_limit_window_secs: 3600,
            provider_timeout_secs: 120,
            download_timeout_secs: 60,
            image_model: settings.model,
            image_size: settings.size,
            image_quality: settings.quality,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の参照関数から読み込む（空文字は未設定扱い）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Ok(Config {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            cache_dir: get("PICTOR_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            rate_limit_requests: parse_or(
                "RATE_LIMIT_REQUESTS",
                get("RATE_LIMIT_REQUESTS"),
                defaults.rate_limit_requests,
            )?,
            rate_limit_window_secs: parse_or(
                "RATE_LIMIT_WINDOW",
                get("RATE_LIMIT_WINDOW"),
                defaults.rate_limit_window_secs,
            )?,
            provider_timeout_secs: parse_or(
                "PROVIDER_TIMEOUT",
                get("PROVIDER_TIMEOUT"),
                defaults.provider_timeout_secs,
            )?,
            download_timeout_secs: parse_or(
                "DOWNLOAD_TIMEOUT",
                get("DOWNLOAD_TIMEOUT"),
                defaults.download_timeout_secs,
            )?,
            image_model: get("IMAGE_MODEL").unwrap_or(defaults.image_model),
            image_size: parse_or("IMAGE_SIZE", get("IMAGE_SIZE"), defaults.image_size)?,
            image_quality: parse_or(
                "IMAGE_QUALITY",
                get("IMAGE_QUALITY"),
                defaults.image_quality,
            )?,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn image_settings(&self) -> ImageSettings {
        ImageSettings {
            model: self.image_model.clone(),
            size: self.image_size,
            quality: self.image_quality,
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
