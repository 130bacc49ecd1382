//! Server configuration.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use edufund_common::constants;
use edufund_fx::provider::OPENEXCHANGERATES_API_URL;
use edufund_fx::{CurrencyServiceConfig, OpenExchangeRatesConfig, RateCacheConfig};
use tracing::warn;

/// Exchange-rate configuration.
#[derive(Debug, Clone)]
pub struct RatesConfig {
    /// OpenExchangeRates app id. Unset means fallback rates only.
    pub api_key: Option<String>,
    /// `latest.json` endpoint.
    pub endpoint: String,
    /// How long fetched rates are reused.
    pub cache_ttl: Duration,
    /// Upstream fetch timeout.
    pub fetch_timeout: Duration,
    /// Share one refresh among concurrent requests.
    pub coalesce_refreshes: bool,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: OPENEXCHANGERATES_API_URL.to_string(),
            cache_ttl: Duration::from_secs(3600),
            fetch_timeout: constants::rate_fetch_timeout(),
            coalesce_refreshes: false,
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Exchange-rate configuration.
    pub rates: RatesConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 5000,
            rates: RatesConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("EDUFUND_LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = parsed(&lookup, "EDUFUND_LISTEN_PORT") {
            config.listen_port = port;
        }

        if let Some(key) = lookup("OPENEXCHANGERATES_API_KEY") {
            if !key.trim().is_empty() {
                config.rates.api_key = Some(key);
            }
        }

        if let Some(url) = lookup("OPENEXCHANGERATES_API_URL") {
            config.rates.endpoint = url;
        }

        if let Some(secs) = parsed::<u64, _>(&lookup, "RATES_CACHE_TTL_SECS") {
            config.rates.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(ms) = parsed::<u64, _>(&lookup, "RATES_FETCH_TIMEOUT_MS") {
            config.rates.fetch_timeout = Duration::from_millis(ms);
        }

        if let Some(coalesce) = parsed(&lookup, "RATES_COALESCE_REFRESHES") {
            config.rates.coalesce_refreshes = coalesce;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.rates.endpoint.trim().is_empty() {
            return Err("Rates endpoint cannot be empty".to_string());
        }

        if self.rates.cache_ttl.is_zero() {
            return Err("Rates cache TTL cannot be 0".to_string());
        }

        if self.rates.fetch_timeout.is_zero() {
            return Err("Rates fetch timeout cannot be 0".to_string());
        }

        Ok(())
    }

    /// Address to bind.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }

    /// Whether live rates can be fetched.
    pub fn has_api_key(&self) -> bool {
        self.rates.api_key.is_some()
    }

    /// Provider settings derived from this configuration.
    pub fn provider_config(&self) -> OpenExchangeRatesConfig {
        OpenExchangeRatesConfig {
            endpoint: self.rates.endpoint.clone(),
            api_key: self.rates.api_key.clone(),
            timeout: self.rates.fetch_timeout,
            ..Default::default()
        }
    }

    /// Currency service settings derived from this configuration.
    pub fn service_config(&self) -> CurrencyServiceConfig {
        let ttl = ChronoDuration::from_std(self.rates.cache_ttl)
            .unwrap_or_else(|_| constants::rate_cache_duration());

        CurrencyServiceConfig {
            cache: RateCacheConfig { ttl },
            fetch_timeout: self.rates.fetch_timeout,
            coalesce_refreshes: self.rates.coalesce_refreshes,
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Invalid configuration value, keeping default");
            None
        }
    }
}
