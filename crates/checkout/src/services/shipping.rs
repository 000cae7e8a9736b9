//! Shipping collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::money::{Currency, Money};

/// Supplies the shipping cost for a destination country in a currency.
#[async_trait]
pub trait ShippingService: Send + Sync {
    async fn cost_for(&self, country: &str, currency: Currency) -> Money;
}

#[derive(Debug, Default)]
struct ShippingState {
    defaults: HashMap<Currency, Money>,
    by_country: HashMap<(String, Currency), Money>,
}

/// In-memory shipping service: per-country cost with a default fallback.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<ShippingState>>,
}

impl InMemoryShippingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback cost for a currency.
    pub async fn set_default(&self, currency: Currency, cost: Money) {
        self.state.write().await.defaults.insert(currency, cost);
    }

    /// Sets the cost for a specific country.
    pub async fn set_country(&self, country: impl Into<String>, currency: Currency, cost: Money) {
        self.state
            .write()
            .await
            .by_country
            .insert((country.into().to_lowercase(), currency), cost);
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn cost_for(&self, country: &str, currency: Currency) -> Money {
        let state = self.state.read().await;
        state
            .by_country
            .get(&(country.to_lowercase(), currency))
            .or_else(|| state.defaults.get(&currency))
            .copied()
            .unwrap_or_else(Money::zero)
    }
}
