//! HTTP handlers for the currency API.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use edufund_common::{format_currency, format_currency_short, now, CurrencyCode, Timestamp};
use edufund_fx::{ConversionResult, FxStats, RatesListing, ReceiptConversion};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Successful response body; the payload's fields sit next to `success`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Success<T> {
    fn new(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub amount: Decimal,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertMultipleRequest {
    pub amount: Decimal,
    pub from: Option<String>,
    pub targets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MultipleConversions {
    pub from: CurrencyCode,
    pub conversions: BTreeMap<CurrencyCode, ConversionResult>,
}

/// Receipt conversion plus the Dirham amount as shown on receipts.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    #[serde(flatten)]
    pub receipt: ReceiptConversion,
    pub formatted: FormattedAmount,
}

#[derive(Debug, Serialize)]
pub struct FormattedAmount {
    /// e.g. `1.500 MAD`
    pub long: String,
    /// e.g. `1.500 DH`
    pub short: String,
}

#[derive(Debug, Serialize)]
pub struct RatesSettings {
    pub cache_ttl_secs: u64,
    pub coalesce_refreshes: bool,
    pub live_rates_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: Timestamp,
    pub provider: String,
    pub rates: RatesSettings,
    pub stats: FxStats,
}

fn code_or(raw: Option<&str>, default: CurrencyCode) -> ApiResult<CurrencyCode> {
    match raw {
        Some(code) => Ok(CurrencyCode::parse(code)?),
        None => Ok(default),
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `POST /api/currency/convert`
pub async fn convert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> ApiResult<Json<Success<ConversionResult>>> {
    let request = body(payload)?;
    let from = code_or(request.from.as_deref(), CurrencyCode::mad())?;
    let to = code_or(request.to.as_deref(), CurrencyCode::usd())?;

    let result = state.currency.convert(request.amount, &from, &to).await?;
    Ok(Success::new(result))
}

/// `POST /api/currency/convert-multiple`
pub async fn convert_multiple(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertMultipleRequest>, JsonRejection>,
) -> ApiResult<Json<Success<MultipleConversions>>> {
    let request = body(payload)?;
    let from = code_or(request.from.as_deref(), CurrencyCode::mad())?;
    let targets = request
        .targets
        .iter()
        .map(|code| CurrencyCode::parse(code))
        .collect::<Result<Vec<_>, _>>()?;

    let conversions = state
        .currency
        .convert_to_multiple(request.amount, &from, &targets)
        .await?;

    Ok(Success::new(MultipleConversions { from, conversions }))
}

/// `GET /api/currency/convert-mad/:amount`
pub async fn convert_mad(
    State(state): State<Arc<AppState>>,
    Path(amount): Path<String>,
) -> ApiResult<Json<Success<ReceiptResponse>>> {
    let amount = Decimal::from_str(amount.trim())
        .map_err(|_| ApiError::BadRequest(format!("Invalid amount: {amount:?}")))?;

    let receipt = state.currency.convert_mad_to_multiple(amount).await?;
    let formatted = FormattedAmount {
        long: format_currency(receipt.mad, true),
        short: format_currency_short(receipt.mad),
    };
    Ok(Success::new(ReceiptResponse { receipt, formatted }))
}

/// `GET /api/currency/rates`
pub async fn rates(State(state): State<Arc<AppState>>) -> ApiResult<Json<Success<RatesListing>>> {
    let listing = state.currency.list_rates().await?;
    Ok(Success::new(listing))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: now(),
        provider: state.currency.provider_name().to_string(),
        rates: RatesSettings {
            cache_ttl_secs: state.config.rates.cache_ttl.as_secs(),
            coalesce_refreshes: state.config.rates.coalesce_refreshes,
            live_rates_configured: state.config.has_api_key(),
        },
        stats: state.currency.stats(),
    })
}
