//! Main currency service implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use edufund_common::{constants, Clock, CurrencyCode, SystemClock};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{RateCache, RateCacheConfig};
use crate::conversion::{
    convert_with, ConversionResult, RatesListing, RatesSnapshot, ReceiptConversion, ReceiptRates,
};
use crate::error::{FxError, FxResult};
use crate::provider::RateProvider;

/// Configuration for the currency service.
#[derive(Debug, Clone)]
pub struct CurrencyServiceConfig {
    /// Cache configuration.
    pub cache: RateCacheConfig,
    /// Upper bound on one provider fetch.
    pub fetch_timeout: Duration,
    /// Let one caller refresh while concurrent callers wait for its result.
    pub coalesce_refreshes: bool,
}

impl Default for CurrencyServiceConfig {
    fn default() -> Self {
        Self {
            cache: RateCacheConfig::default(),
            fetch_timeout: constants::rate_fetch_timeout(),
            coalesce_refreshes: false,
        }
    }
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    refreshes: AtomicU64,
    refresh_failures: AtomicU64,
    fallbacks_served: AtomicU64,
    conversions: AtomicU64,
}

/// Point-in-time copy of the service counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FxStats {
    pub cache_hits: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub fallbacks_served: u64,
    pub conversions: u64,
}

/// Resolves exchange rates and converts amounts between currencies.
///
/// Live rates are cached for the configured TTL. When the provider is not
/// configured or a refresh fails, the hard-coded fallback table is served
/// for that call only and the cache is left untouched, so the next call
/// tries the provider again.
pub struct CurrencyService {
    provider: Arc<dyn RateProvider>,
    cache: RateCache,
    clock: Arc<dyn Clock>,
    config: CurrencyServiceConfig,
    refresh_gate: tokio::sync::Mutex<()>,
    /// Bumped when a refresh attempt succeeds or fails transiently.
    refresh_generation: AtomicU64,
    counters: Counters,
}

impl CurrencyService {
    /// Create a new service using the wall clock.
    pub fn new(provider: Arc<dyn RateProvider>, config: CurrencyServiceConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Create a new service with an explicit clock.
    pub fn with_clock(
        provider: Arc<dyn RateProvider>,
        config: CurrencyServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            cache: RateCache::with_config(config.cache.clone()),
            clock,
            config,
            refresh_gate: tokio::sync::Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Get the freshest rates available.
    ///
    /// Only request construction failures are returned as errors; upstream
    /// failures resolve to the fallback table.
    #[instrument(skip(self))]
    pub async fn get_rates(&self) -> FxResult<RatesSnapshot> {
        if let Some(snapshot) = self.cached() {
            return Ok(snapshot);
        }

        if !self.provider.is_configured() {
            warn!(
                provider = self.provider.name(),
                "Rate provider API key not configured, using fallback rates"
            );
            return Ok(self.fallback());
        }

        if self.config.coalesce_refreshes {
            self.refresh_coalesced().await
        } else {
            self.refresh().await
        }
    }

    /// Convert an amount between two currencies through the base currency.
    ///
    /// Currencies missing from the resolved table are priced at parity with
    /// the base currency.
    #[instrument(skip_all, fields(amount = %amount, from = %from, to = %to))]
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> FxResult<ConversionResult> {
        let snapshot = self.get_rates().await?;

        for code in [from, to] {
            if !snapshot.rates.contains(code) {
                debug!(currency = %code, "Currency not quoted, assuming parity with base");
            }
        }

        let result = convert_with(&snapshot, amount, from, to, self.clock.now())?;
        self.counters.conversions.fetch_add(1, Ordering::Relaxed);

        debug!(
            converted = %result.converted_amount,
            exchange_rate = %result.exchange_rate,
            source = result.source.as_str(),
            "Conversion completed"
        );

        Ok(result)
    }

    /// Convert one amount into several currencies concurrently.
    ///
    /// Each leg resolves rates on its own, so legs may straddle a refresh.
    pub async fn convert_to_multiple(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        targets: &[CurrencyCode],
    ) -> FxResult<BTreeMap<CurrencyCode, ConversionResult>> {
        let legs = targets.iter().map(|to| self.convert(amount, from, to));
        let results = try_join_all(legs).await?;

        Ok(results
            .into_iter()
            .map(|result| (result.converted_currency.clone(), result))
            .collect())
    }

    /// Dirham amount with its USD and EUR equivalents, for receipts.
    pub async fn convert_mad_to_multiple(&self, amount: Decimal) -> FxResult<ReceiptConversion> {
        let mad = CurrencyCode::mad();
        let usd_code = CurrencyCode::usd();
        let eur_code = CurrencyCode::eur();
        let (usd, eur) = tokio::try_join!(
            self.convert(amount, &mad, &usd_code),
            self.convert(amount, &mad, &eur_code),
        )?;

        Ok(ReceiptConversion {
            mad: amount,
            usd: usd.converted_amount,
            eur: eur.converted_amount,
            rates: ReceiptRates {
                mad_usd: usd.exchange_rate,
                mad_eur: eur.exchange_rate,
            },
            timestamp: self.clock.now(),
            source: usd.source.combine(eur.source),
        })
    }

    /// All rates currently in use.
    pub async fn list_rates(&self) -> FxResult<RatesListing> {
        let snapshot = self.get_rates().await?;
        Ok(RatesListing {
            base: snapshot.rates.base(),
            rates: snapshot.rates.as_ref().clone(),
            timestamp: self.clock.now(),
            source: snapshot.source,
        })
    }

    /// Get service statistics.
    pub fn stats(&self) -> FxStats {
        FxStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.counters.refresh_failures.load(Ordering::Relaxed),
            fallbacks_served: self.counters.fallbacks_served.load(Ordering::Relaxed),
            conversions: self.counters.conversions.load(Ordering::Relaxed),
        }
    }

    /// Name of the configured rate provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn cached(&self) -> Option<RatesSnapshot> {
        let entry = self.cache.fresh(self.clock.now())?;
        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        Some(RatesSnapshot::live(entry.rates.clone(), entry.fetched_at))
    }

    fn fallback(&self) -> RatesSnapshot {
        self.counters.fallbacks_served.fetch_add(1, Ordering::Relaxed);
        RatesSnapshot::fallback()
    }

    async fn refresh_coalesced(&self) -> FxResult<RatesSnapshot> {
        let generation_seen = self.refresh_generation.load(Ordering::SeqCst);
        let _gate = self.refresh_gate.lock().await;

        if let Some(snapshot) = self.cached() {
            return Ok(snapshot);
        }

        // A refresh finished while we waited and the cache is still stale,
        // so that attempt failed transiently.
        if self.refresh_generation.load(Ordering::SeqCst) != generation_seen {
            debug!("Concurrent refresh failed, using fallback rates");
            return Ok(self.fallback());
        }

        self.refresh().await
    }

    async fn refresh(&self) -> FxResult<RatesSnapshot> {
        self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
        info!(provider = self.provider.name(), "Fetching latest exchange rates");

        let fetched =
            match tokio::time::timeout(self.config.fetch_timeout, self.provider.fetch_latest()).await {
                Ok(result) => result,
                Err(_) => Err(FxError::Timeout {
                    after_ms: self.config.fetch_timeout.as_millis() as u64,
                }),
            };
        // Waiters retry after a non-transient failure so they see the error too.
        if !matches!(&fetched, Err(e) if !e.is_transient()) {
            self.refresh_generation.fetch_add(1, Ordering::SeqCst);
        }

        match fetched {
            Ok(rates) => {
                let entry = self.cache.store(rates, self.clock.now());
                info!(
                    currencies = entry.rates.len(),
                    fetched_at = %entry.fetched_at,
                    "Exchange rates updated"
                );
                Ok(RatesSnapshot::live(entry.rates.clone(), entry.fetched_at))
            }
            Err(e) if e.is_transient() => {
                self.counters.refresh_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    code = e.error_code(),
                    "Failed to fetch exchange rates, using fallback rates"
                );
                Ok(self.fallback())
            }
            Err(e) => {
                error!(
                    provider = self.provider.name(),
                    error = %e,
                    "Exchange rate request could not be made"
                );
                Err(e)
            }
        }
    }
}
