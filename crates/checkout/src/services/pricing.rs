//! Pricing collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::Sku;
use tokio::sync::RwLock;

use crate::money::{Currency, Money};

/// Supplies per-SKU unit prices in a given currency.
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Returns the unit price for a SKU, or `None` if no price is
    /// configured for that currency.
    async fn price_of(&self, sku: &Sku, currency: Currency) -> Option<Money>;
}

/// In-memory pricing service for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPricingService {
    prices: Arc<RwLock<HashMap<(Sku, Currency), Money>>>,
}

impl InMemoryPricingService {
    /// Creates a new pricing service with no prices configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unit price for a SKU in a currency.
    pub async fn set_price(&self, sku: impl Into<Sku>, currency: Currency, price: Money) {
        self.prices
            .write()
            .await
            .insert((sku.into(), currency), price);
    }
}

#[async_trait]
impl PricingService for InMemoryPricingService {
    async fn price_of(&self, sku: &Sku, currency: Currency) -> Option<Money> {
        self.prices
            .read()
            .await
            .get(&(sku.clone(), currency))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn price_lookup_by_sku_and_currency() {
        let pricing = InMemoryPricingService::new();
        pricing
            .set_price("SKU-001", Currency::Usd, Money::from_minor(1500))
            .await;

        let sku = Sku::new("SKU-001");
        assert_eq!(
            pricing.price_of(&sku, Currency::Usd).await,
            Some(Money::from_minor(1500))
        );
        assert_eq!(pricing.price_of(&sku, Currency::Ngn).await, None);
    }
}
