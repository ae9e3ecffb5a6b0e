// Configuration - .env file plus environment variables

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::error::ClientError;
use crate::geocoding::NOMINATIM_BASE_URL;

pub const DEFAULT_SIMULATION_URL: &str = "http://127.0.0.1:8000/simulate";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub simulation_url: String,
    pub geocoder_url: String,
    pub accept_language: String,
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation_url: DEFAULT_SIMULATION_URL.to_string(),
            geocoder_url: NOMINATIM_BASE_URL.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read `IMPACT_*` variables
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };

        let http_timeout = match lookup("IMPACT_HTTP_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!("ignoring invalid IMPACT_HTTP_TIMEOUT_SECS={:?}", raw);
                    defaults.http_timeout
                }
            },
            None => defaults.http_timeout,
        };

        Self {
            simulation_url: text("IMPACT_SIMULATION_URL", defaults.simulation_url),
            geocoder_url: text("IMPACT_GEOCODER_URL", defaults.geocoder_url),
            accept_language: text("IMPACT_ACCEPT_LANGUAGE", defaults.accept_language),
            http_timeout,
        }
    }

    /// Shared HTTP client; the geocoder's usage policy asks for a real user agent
    pub fn http_client(&self) -> Result<reqwest::Client, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}
