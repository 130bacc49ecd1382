//! FX engine error types.

use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Transport-level failure talking to the rate provider.
    #[error("Rate provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate provider did not answer in time.
    #[error("Rate provider timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Rate provider answered with a non-success status.
    #[error("Rate provider returned status {status}")]
    UpstreamStatus { status: u16 },

    /// Response body could not be understood.
    #[error("Malformed rate provider response: {0}")]
    MalformedResponse(String),

    /// Response body had no `rates` object.
    #[error("Rate provider response is missing rates")]
    MissingRates,

    /// The outbound request could not be constructed.
    #[error("Could not build rate provider request: {0}")]
    RequestBuild(String),

    /// Conversion arithmetic overflowed.
    #[error("Amount {amount} is out of range for conversion")]
    AmountOutOfRange { amount: String },
}

impl FxError {
    /// Whether the failure is an upstream hiccup that fallback rates can
    /// stand in for. Everything else reaches the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FxError::Http(_)
                | FxError::Timeout { .. }
                | FxError::UpstreamStatus { .. }
                | FxError::MalformedResponse(_)
                | FxError::MissingRates
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Http(_) => "UPSTREAM_UNREACHABLE",
            FxError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            FxError::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            FxError::MalformedResponse(_) => "UPSTREAM_MALFORMED",
            FxError::MissingRates => "UPSTREAM_MISSING_RATES",
            FxError::RequestBuild(_) => "REQUEST_BUILD_FAILED",
            FxError::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
