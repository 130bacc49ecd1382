//! Rate provider trait and implementations.

use async_trait::async_trait;
use edufund_common::{constants, CurrencyCode, RateTable, BASE_CURRENCY};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

/// Default OpenExchangeRates endpoint.
pub const OPENEXCHANGERATES_API_URL: &str = "https://openexchangerates.org/api/latest.json";

/// Trait for FX rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Whether credentials are present. Unconfigured providers are never called.
    fn is_configured(&self) -> bool;

    /// Fetch the latest rates against the base currency.
    async fn fetch_latest(&self) -> FxResult<RateTable>;
}

/// Configuration for the OpenExchangeRates provider.
#[derive(Debug, Clone)]
pub struct OpenExchangeRatesConfig {
    /// `latest.json` endpoint.
    pub endpoint: String,
    /// App id. `None` or blank selects fallback rates.
    pub api_key: Option<String>,
    /// Currencies requested from the provider.
    pub symbols: Vec<CurrencyCode>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for OpenExchangeRatesConfig {
    fn default() -> Self {
        Self {
            endpoint: OPENEXCHANGERATES_API_URL.to_string(),
            api_key: None,
            symbols: vec![
                CurrencyCode::mad(),
                CurrencyCode::eur(),
                CurrencyCode::gbp(),
                CurrencyCode::cad(),
                CurrencyCode::aud(),
                CurrencyCode::jpy(),
                CurrencyCode::chf(),
            ],
            timeout: constants::rate_fetch_timeout(),
        }
    }
}

/// Fetches USD-based rates from openexchangerates.org.
pub struct OpenExchangeRatesProvider {
    client: Client,
    config: OpenExchangeRatesConfig,
}

impl OpenExchangeRatesProvider {
    /// Create a new provider.
    pub fn new(config: OpenExchangeRatesConfig) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FxError::RequestBuild(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a provider around an existing HTTP client.
    pub fn with_client(client: Client, config: OpenExchangeRatesConfig) -> Self {
        Self { client, config }
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn symbols(&self) -> String {
        self.config
            .symbols
            .iter()
            .map(CurrencyCode::code)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl RateProvider for OpenExchangeRatesProvider {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    async fn fetch_latest(&self) -> FxResult<RateTable> {
        let api_key = self
            .api_key()
            .ok_or_else(|| FxError::RequestBuild("API key not configured".to_string()))?;
        let symbols = self.symbols();

        let request = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("app_id", api_key),
                ("base", BASE_CURRENCY),
                ("symbols", symbols.as_str()),
            ])
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| FxError::RequestBuild(e.to_string()))?;

        debug!(provider = self.name(), symbols = %symbols, "Requesting latest rates");

        let response = self.client.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                FxError::Timeout {
                    after_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                FxError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_rates_body(&body)
    }
}

/// Parse a `latest.json` body into a rate table.
///
/// Codes that are not three letters are skipped. Values that are not
/// positive numbers make the whole body malformed.
pub fn parse_rates_body(body: &str) -> FxResult<RateTable> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FxError::MalformedResponse(e.to_string()))?;

    let rates = value
        .get("rates")
        .and_then(Value::as_object)
        .ok_or(FxError::MissingRates)?;

    let mut quotes = Vec::with_capacity(rates.len());
    for (code, rate) in rates {
        let code = match CurrencyCode::parse(code) {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, "Skipping unrecognised currency in provider response");
                continue;
            }
        };
        let rate = rate
            .as_f64()
            .and_then(Decimal::from_f64)
            .ok_or_else(|| FxError::MalformedResponse(format!("rate for {code} is not a number")))?;
        quotes.push((code, rate));
    }

    RateTable::from_quotes(quotes).map_err(|e| FxError::MalformedResponse(e.to_string()))
}

/// Scripted behaviour of a [`MockRateProvider`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return this table.
    Succeed(RateTable),
    /// Fail as if the provider answered with this status.
    Status(u16),
    /// Fail as if the body had no rates.
    MissingRates,
    /// Fail before any request is sent.
    RequestBuild,
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    configured: bool,
    behavior: parking_lot::Mutex<MockBehavior>,
    delay: Option<Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a configured mock that succeeds with the given table.
    pub fn new(name: impl Into<String>, rates: RateTable) -> Self {
        Self::with_behavior(name, MockBehavior::Succeed(rates))
    }

    /// Create a configured mock with scripted behaviour.
    pub fn with_behavior(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            configured: true,
            behavior: parking_lot::Mutex::new(behavior),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a configured mock that always fails upstream.
    pub fn failing(name: impl Into<String>) -> Self {
        Self::with_behavior(name, MockBehavior::Status(503))
    }

    /// Mark the mock as missing credentials.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the scripted behaviour.
    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Number of fetches made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch_latest(&self) -> FxResult<RateTable> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self.behavior.lock().clone();
        match behavior {
            MockBehavior::Succeed(rates) => Ok(rates),
            MockBehavior::Status(status) => Err(FxError::UpstreamStatus { status }),
            MockBehavior::MissingRates => Err(FxError::MissingRates),
            MockBehavior::RequestBuild => Err(FxError::RequestBuild("mock".to_string())),
        }
    }
}
