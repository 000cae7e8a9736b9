//! Money and currency value objects.

use serde::{Deserialize, Serialize};

/// Currencies the storefront can charge in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ngn,
}

impl Currency {
    /// Returns the ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ngn => "NGN",
        }
    }

    /// Parses a currency from its ISO code, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::Usd),
            "NGN" => Some(Currency::Ngn),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Money amount in minor units (cents, kobo) to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from minor units.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds another amount.
    pub fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }

    /// Multiplies a unit price by a quantity.
    pub fn multiply(self, qty: u32) -> Money {
        Money(self.0 * qty as i64)
    }

    /// Applies a fractional rate (e.g. a 7.5% tax as `0.075`), rounding
    /// half-up to the nearest minor unit.
    pub fn apply_rate(self, rate: f64) -> Money {
        Money((self.0 as f64 * rate).round() as i64)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}
