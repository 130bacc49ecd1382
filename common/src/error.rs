//! Error types for currency values.

use thiserror::Error;

use crate::CurrencyCode;

/// Errors raised while constructing currency codes and rate tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Code is not three ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCode(String),

    /// A quoted rate was zero or negative.
    #[error("Rate for {code} must be positive, got {rate}")]
    NonPositiveRate { code: CurrencyCode, rate: String },
}

impl CurrencyError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            CurrencyError::InvalidCode(_) => "INVALID_CURRENCY_CODE",
            CurrencyError::NonPositiveRate { .. } => "NON_POSITIVE_RATE",
        }
    }
}
