use std::sync::Arc;

use edufund_fx::{CurrencyService, FxResult, OpenExchangeRatesProvider};

use crate::config::ServerConfig;

/// Shared application state.
pub struct AppState {
    pub currency: Arc<CurrencyService>,
    pub config: ServerConfig,
}

impl AppState {
    /// Build the state with the OpenExchangeRates provider.
    pub fn new(config: ServerConfig) -> FxResult<Arc<Self>> {
        let provider = OpenExchangeRatesProvider::new(config.provider_config())?;
        let currency = CurrencyService::new(Arc::new(provider), config.service_config());
        Ok(Self::with_service(config, Arc::new(currency)))
    }

    /// Build the state around an existing currency service.
    pub fn with_service(config: ServerConfig, currency: Arc<CurrencyService>) -> Arc<Self> {
        Arc::new(Self { currency, config })
    }
}
