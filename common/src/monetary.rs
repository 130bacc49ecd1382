//! Currency codes, rate tables and rounding rules.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CurrencyError;

/// Code of the currency every rate is quoted against.
pub const BASE_CURRENCY: &str = "USD";

/// Decimal places kept on converted amounts.
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

/// Decimal places kept on reported exchange rates.
pub const RATE_DECIMAL_PLACES: u32 = 6;

/// ISO 4217 style currency code: three ASCII letters, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a currency code, trimming and uppercasing the input.
    pub fn parse(code: &str) -> Result<Self, CurrencyError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::InvalidCode(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether this is the base currency.
    pub fn is_base(&self) -> bool {
        self.0 == BASE_CURRENCY
    }

    fn known(code: &'static str) -> Self {
        Self(code.to_string())
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self::known("USD")
    }

    pub fn mad() -> Self {
        Self::known("MAD")
    }

    pub fn eur() -> Self {
        Self::known("EUR")
    }

    pub fn gbp() -> Self {
        Self::known("GBP")
    }

    pub fn cad() -> Self {
        Self::known("CAD")
    }

    pub fn aud() -> Self {
        Self::known("AUD")
    }

    pub fn jpy() -> Self {
        Self::known("JPY")
    }

    pub fn chf() -> Self {
        Self::known("CHF")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Units of each currency per one unit of the base currency.
///
/// The base entry is always exactly one and every other rate is positive.
/// Tables are never mutated after construction; a refresh builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<CurrencyCode, Decimal>")]
pub struct RateTable {
    #[serde(flatten)]
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl RateTable {
    /// Build a table from quotes against the base currency.
    ///
    /// The base currency is always injected with rate one, overriding any
    /// quote supplied for it.
    pub fn from_quotes<I>(quotes: I) -> Result<Self, CurrencyError>
    where
        I: IntoIterator<Item = (CurrencyCode, Decimal)>,
    {
        let mut rates = BTreeMap::new();
        for (code, rate) in quotes {
            if code.is_base() {
                continue;
            }
            if rate <= Decimal::ZERO {
                return Err(CurrencyError::NonPositiveRate {
                    code,
                    rate: rate.to_string(),
                });
            }
            rates.insert(code, rate);
        }
        rates.insert(CurrencyCode::usd(), Decimal::ONE);
        Ok(Self { rates })
    }

    /// Hard-coded rates used when live data is unavailable.
    pub fn fallback() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert(CurrencyCode::usd(), Decimal::ONE);
        rates.insert(CurrencyCode::mad(), Decimal::new(100, 1));
        rates.insert(CurrencyCode::eur(), Decimal::new(92, 2));
        Self { rates }
    }

    /// The base currency of this table.
    pub fn base(&self) -> CurrencyCode {
        CurrencyCode::usd()
    }

    /// Rate for a currency, or one when the currency is not quoted.
    pub fn rate(&self, code: &CurrencyCode) -> Decimal {
        self.rates.get(code).copied().unwrap_or(Decimal::ONE)
    }

    /// Rate for a currency if quoted.
    pub fn get(&self, code: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    /// Check if a currency is quoted.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// Number of quoted currencies, base included.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Always false: the base currency is always present.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Iterate quotes in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, &Decimal)> {
        self.rates.iter()
    }
}

impl TryFrom<BTreeMap<CurrencyCode, Decimal>> for RateTable {
    type Error = CurrencyError;

    fn try_from(rates: BTreeMap<CurrencyCode, Decimal>) -> Result<Self, Self::Error> {
        Self::from_quotes(rates)
    }
}

/// Round a converted amount to two places, midpoints away from zero.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an exchange rate to six places, midpoints away from zero.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}
