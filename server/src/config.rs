use std::path::PathBuf;
use std::time::Duration;

use cyclops_shared::TemperatureScale;
use cyclops_shared::colors::{DEFAULT_SCALE_HIGH_C, DEFAULT_SCALE_LOW_C};

pub const OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
pub const SSE_KEEPALIVE_SECS: u64 = 15;
pub const DEFAULT_BROADCAST_BUFFER: usize = 256;
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_SERVER_PORT: u16 = 5006;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const COMMAND_BUFFER: usize = 16;
pub const LEGEND_STOPS: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required to query the weather provider")]
    MissingApiKey(&'static str),
}

/// Provider credential. There is no built-in fallback key.
pub fn provider_api_key() -> Result<String, ConfigError> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingApiKey(API_KEY_ENV))
}

pub fn provider_url() -> String {
    std::env::var("OPENWEATHERMAP_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| OPENWEATHERMAP_URL.to_string())
}

pub fn refresh_interval() -> Duration {
    std::env::var("REFRESH_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS))
}

pub fn server_port() -> u16 {
    std::env::var("CYCLOPS_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn sse_broadcast_buffer() -> usize {
    std::env::var("SSE_BROADCAST_BUFFER")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BROADCAST_BUFFER)
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

/// Optional replacement for the built-in city dataset.
pub fn catalog_path() -> Option<PathBuf> {
    std::env::var_os("CYCLOPS_CATALOG_PATH")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn initial_region() -> Option<String> {
    std::env::var("CYCLOPS_INITIAL_REGION")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn static_dir() -> PathBuf {
    std::env::var_os("CYCLOPS_STATIC_DIR")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

pub fn temperature_scale() -> TemperatureScale {
    let low = env_f64("TEMPERATURE_SCALE_LOW").unwrap_or(DEFAULT_SCALE_LOW_C);
    let high = env_f64("TEMPERATURE_SCALE_HIGH").unwrap_or(DEFAULT_SCALE_HIGH_C);
    TemperatureScale::new(low, high)
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}
