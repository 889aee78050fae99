//! Configuration management for the research console.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the research backend
    pub api_base_url: String,
    /// Transport timeout for backend calls
    pub request_timeout: Duration,
    /// Delay before a simulated query settles
    pub simulated_latency: Duration,
    /// File backing the persisted settings
    pub settings_path: PathBuf,
    /// Start in live mode instead of simulated mode
    pub live: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout: Duration::from_millis(60_000),
            simulated_latency: Duration::from_millis(750),
            settings_path: PathBuf::from(".mrs/settings.json"),
            live: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            api_base_url: env::var("MRS_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            request_timeout: millis_var("MRS_REQUEST_TIMEOUT_MS")?
                .unwrap_or(defaults.request_timeout),
            simulated_latency: millis_var("MRS_SIMULATED_LATENCY_MS")?
                .unwrap_or(defaults.simulated_latency),
            settings_path: env::var("MRS_SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.settings_path),
            live: env::var("MRS_LIVE")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn millis_var(name: &str) -> Result<Option<Duration>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| Error::Config(format!("{} must be a number of milliseconds, got {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dashboard() {
        let config = Config::default();
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.simulated_latency, Duration::from_millis(750));
        assert!(!config.live);
    }
}
