//! EduFund FX Engine
//!
//! Exchange-rate caching and currency conversion for EduFund.
//!
//! # Features
//!
//! - USD-based rates fetched from OpenExchangeRates
//! - Single-entry rate cache with a one hour TTL
//! - Hard-coded fallback rates when the provider is unconfigured or failing
//! - Two-hop conversion through the base currency
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use edufund_fx::{CurrencyService, CurrencyServiceConfig, OpenExchangeRatesProvider};
//! use edufund_common::CurrencyCode;
//!
//! let provider = OpenExchangeRatesProvider::new(Default::default())?;
//! let service = CurrencyService::new(Arc::new(provider), CurrencyServiceConfig::default());
//!
//! let result = service.convert(dec!(500), &CurrencyCode::mad(), &CurrencyCode::usd()).await?;
//! println!("{} {}", result.converted_amount, result.source.as_str());
//! ```

pub mod engine;
pub mod provider;
pub mod cache;
pub mod conversion;
pub mod error;

pub use engine::{CurrencyService, CurrencyServiceConfig, FxStats};
pub use provider::{OpenExchangeRatesConfig, OpenExchangeRatesProvider, RateProvider};
pub use cache::{CachedRates, RateCache, RateCacheConfig};
pub use conversion::{
    ConversionResult, RateSource, RatesListing, RatesSnapshot, ReceiptConversion, ReceiptRates,
};
pub use error::{FxError, FxResult};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::{MockBehavior, MockRateProvider};
