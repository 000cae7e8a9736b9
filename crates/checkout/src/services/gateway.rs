//! Payment gateway collaborator trait.
//!
//! Only the public-key handoff matters to the core; the gateway protocol
//! itself is out of scope.

use async_trait::async_trait;

/// Supplies gateway credentials for the payment intent response.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the public key the client uses to open the payment form.
    async fn public_key(&self) -> String;
}

/// Gateway with a statically configured public key.
#[derive(Debug, Clone)]
pub struct StaticPaymentGateway {
    public_key: String,
}

impl StaticPaymentGateway {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }
}

impl Default for StaticPaymentGateway {
    fn default() -> Self {
        Self::new("pk_test_placeholder")
    }
}

#[async_trait]
impl PaymentGateway for StaticPaymentGateway {
    async fn public_key(&self) -> String {
        self.public_key.clone()
    }
}
