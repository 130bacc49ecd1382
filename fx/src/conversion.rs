//! Currency conversion types and operations.

use edufund_common::{round_amount, round_rate, CurrencyCode, RateTable, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{FxError, FxResult};

/// Where a rate table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    /// Fetched from the rate provider.
    #[serde(rename = "openexchangerates")]
    Live,
    /// Hard-coded fallback rates.
    #[serde(rename = "fallback")]
    Fallback,
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Live => "openexchangerates",
            RateSource::Fallback => "fallback",
        }
    }

    /// Fallback wins when combining legs of one request.
    pub fn combine(self, other: RateSource) -> RateSource {
        if self == RateSource::Fallback || other == RateSource::Fallback {
            RateSource::Fallback
        } else {
            RateSource::Live
        }
    }
}

/// A resolved rate table tagged with its origin.
#[derive(Debug, Clone)]
pub struct RatesSnapshot {
    pub rates: Arc<RateTable>,
    pub source: RateSource,
    /// When live rates were fetched. `None` for fallback rates.
    pub fetched_at: Option<Timestamp>,
}

impl RatesSnapshot {
    /// Snapshot of the hard-coded fallback table.
    pub fn fallback() -> Self {
        Self {
            rates: Arc::new(RateTable::fallback()),
            source: RateSource::Fallback,
            fetched_at: None,
        }
    }

    /// Snapshot of a live table.
    pub fn live(rates: Arc<RateTable>, fetched_at: Timestamp) -> Self {
        Self {
            rates,
            source: RateSource::Live,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }
}

/// Result of converting one amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub original_amount: Decimal,
    pub original_currency: CurrencyCode,
    /// Rounded to two places.
    pub converted_amount: Decimal,
    pub converted_currency: CurrencyCode,
    /// Units of target per unit of source, rounded to six places.
    pub exchange_rate: Decimal,
    pub timestamp: Timestamp,
    pub source: RateSource,
}

/// All rates currently in use.
#[derive(Debug, Clone, Serialize)]
pub struct RatesListing {
    pub base: CurrencyCode,
    pub rates: RateTable,
    pub timestamp: Timestamp,
    pub source: RateSource,
}

/// Exchange rates printed on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRates {
    #[serde(rename = "MAD_USD")]
    pub mad_usd: Decimal,
    #[serde(rename = "MAD_EUR")]
    pub mad_eur: Decimal,
}

/// A Dirham amount shown alongside its USD and EUR equivalents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptConversion {
    #[serde(rename = "MAD")]
    pub mad: Decimal,
    #[serde(rename = "USD")]
    pub usd: Decimal,
    #[serde(rename = "EUR")]
    pub eur: Decimal,
    pub rates: ReceiptRates,
    pub timestamp: Timestamp,
    pub source: RateSource,
}

/// Unrounded two-hop conversion through the base currency.
///
/// Returns the converted amount and the cross rate.
pub fn two_hop(amount: Decimal, from_rate: Decimal, to_rate: Decimal) -> FxResult<(Decimal, Decimal)> {
    let out_of_range = || FxError::AmountOutOfRange {
        amount: amount.to_string(),
    };

    let in_base = amount.checked_div(from_rate).ok_or_else(out_of_range)?;
    let converted = in_base.checked_mul(to_rate).ok_or_else(out_of_range)?;
    let cross = to_rate.checked_div(from_rate).ok_or_else(out_of_range)?;
    Ok((converted, cross))
}

/// Convert `amount` using the given snapshot.
pub fn convert_with(
    snapshot: &RatesSnapshot,
    amount: Decimal,
    from: &CurrencyCode,
    to: &CurrencyCode,
    timestamp: Timestamp,
) -> FxResult<ConversionResult> {
    let from_rate = snapshot.rates.rate(from);
    let to_rate = snapshot.rates.rate(to);
    let (converted, cross) = two_hop(amount, from_rate, to_rate)?;

    Ok(ConversionResult {
        original_amount: amount,
        original_currency: from.clone(),
        converted_amount: round_amount(converted),
        converted_currency: to.clone(),
        exchange_rate: round_rate(cross),
        timestamp,
        source: snapshot.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edufund_common::now;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_hop() {
        let (converted, cross) = two_hop(dec!(100), dec!(10.0), dec!(1)).unwrap();
        assert_eq!(converted, dec!(10));
        assert_eq!(cross, dec!(0.1));

        let (converted, cross) = two_hop(dec!(1000), dec!(10.0), dec!(0.92)).unwrap();
        assert_eq!(converted, dec!(92));
        assert_eq!(cross, dec!(0.092));
    }

    #[test]
    fn test_two_hop_overflow() {
        let result = two_hop(Decimal::MAX, dec!(0.5), dec!(1));
        assert!(matches!(result, Err(FxError::AmountOutOfRange { .. })));
    }

    #[test]
    fn test_convert_with_fallback_snapshot() {
        let snapshot = RatesSnapshot::fallback();
        let at = now();

        let result =
            convert_with(&snapshot, dec!(100), &CurrencyCode::mad(), &CurrencyCode::usd(), at).unwrap();

        assert_eq!(result.original_amount, dec!(100));
        assert_eq!(result.original_currency, CurrencyCode::mad());
        assert_eq!(result.converted_amount, dec!(10.00));
        assert_eq!(result.converted_currency, CurrencyCode::usd());
        assert_eq!(result.exchange_rate, dec!(0.1));
        assert_eq!(result.timestamp, at);
        assert_eq!(result.source, RateSource::Fallback);
    }

    #[test]
    fn test_roundings_are_independent() {
        let snapshot = RatesSnapshot::fallback();
        let result = convert_with(
            &snapshot,
            dec!(33.33),
            &CurrencyCode::eur(),
            &CurrencyCode::usd(),
            now(),
        )
        .unwrap();

        // 33.33 / 0.92 = 36.2282608...
        assert_eq!(result.converted_amount, dec!(36.23));
        // 1 / 0.92 = 1.0869565...
        assert_eq!(result.exchange_rate, dec!(1.086957));
    }

    #[test]
    fn test_negative_amount_passes_through() {
        let snapshot = RatesSnapshot::fallback();
        let result =
            convert_with(&snapshot, dec!(-50), &CurrencyCode::usd(), &CurrencyCode::mad(), now())
                .unwrap();
        assert_eq!(result.converted_amount, dec!(-500));
    }

    #[test]
    fn test_serialized_shape() {
        let snapshot = RatesSnapshot::fallback();
        let result =
            convert_with(&snapshot, dec!(100), &CurrencyCode::mad(), &CurrencyCode::eur(), now())
                .unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["originalCurrency"], "MAD");
        assert_eq!(json["convertedCurrency"], "EUR");
        assert_eq!(json["convertedAmount"], serde_json::json!(9.2));
        assert_eq!(json["exchangeRate"], serde_json::json!(0.092));
        assert_eq!(json["source"], "fallback");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_rate_source_combine() {
        assert_eq!(RateSource::Live.combine(RateSource::Live), RateSource::Live);
        assert_eq!(RateSource::Live.combine(RateSource::Fallback), RateSource::Fallback);
        assert_eq!(RateSource::Fallback.as_str(), "fallback");
        assert_eq!(RateSource::Live.as_str(), "openexchangerates");
    }

    proptest! {
        #[test]
        fn test_round_trip_within_rounding_bound(
            cents in -10_000_000i64..10_000_000i64,
            from_idx in 0usize..3,
            to_idx in 0usize..3,
        ) {
            let codes = [CurrencyCode::usd(), CurrencyCode::mad(), CurrencyCode::eur()];
            let snapshot = RatesSnapshot::fallback();
            let (from, to) = (&codes[from_idx], &codes[to_idx]);
            let amount = Decimal::new(cents, 2);
            let at = now();

            let there = convert_with(&snapshot, amount, from, to, at).unwrap();
            let back = convert_with(&snapshot, there.converted_amount, to, from, at).unwrap();

            // Each leg rounds to half a cent; the first leg's error is scaled
            // by the return rate.
            let ratio = snapshot.rates.rate(from) / snapshot.rates.rate(to);
            let bound = dec!(0.005) + dec!(0.005) * ratio + dec!(0.000000001);
            prop_assert!((back.converted_amount - amount).abs() <= bound);
        }
    }
}
