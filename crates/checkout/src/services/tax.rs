//! Tax collaborator trait and fixed-rate implementation.

use async_trait::async_trait;

/// A named tax rate, e.g. `vat` at `0.075`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRate {
    pub name: String,
    pub rate: f64,
}

impl TaxRate {
    pub fn new(name: impl Into<String>, rate: f64) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }
}

/// Supplies the tax rate applicable to a destination country.
#[async_trait]
pub trait TaxService: Send + Sync {
    async fn rate_for(&self, country: &str) -> TaxRate;
}

/// Tax service returning the same rate for every country.
#[derive(Debug, Clone)]
pub struct FixedTaxService {
    rate: TaxRate,
}

impl FixedTaxService {
    pub fn new(name: impl Into<String>, rate: f64) -> Self {
        Self {
            rate: TaxRate::new(name, rate),
        }
    }
}

impl Default for FixedTaxService {
    fn default() -> Self {
        Self::new("vat", 0.075)
    }
}

#[async_trait]
impl TaxService for FixedTaxService {
    async fn rate_for(&self, _country: &str) -> TaxRate {
        self.rate.clone()
    }
}
