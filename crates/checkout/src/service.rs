//! The reservation coordinator: reconciles a session's cart against the
//! inventory store and reservation ledger, producing a payment intent.

use chrono::{Duration, Utc};
use common::{CheckoutRef, SessionToken, Sku};
use reservation_store::{ReservationStore, Session};
use serde::Serialize;

use crate::error::CheckoutError;
use crate::money::{Currency, Money};
use crate::services::gateway::PaymentGateway;
use crate::services::pricing::PricingService;
use crate::services::shipping::ShippingService;
use crate::services::tax::TaxService;

/// Sessions live this long from their first cart interaction.
const SESSION_TTL_HOURS: i64 = 12;

/// Everything the client needs to open the payment form: a fresh
/// reference, the display currency, the payable amount, and the gateway
/// public key.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub reference: CheckoutRef,
    pub currency: Currency,
    pub amount: Money,
    pub gateway_public_key: String,
}

/// Coordinates checkout: cart snapshot in, payment intent out, with the
/// ledger's PENDING rows left exactly mirroring the cart.
pub struct CheckoutService<S, P, T, H, G>
where
    S: ReservationStore,
    P: PricingService,
    T: TaxService,
    H: ShippingService,
    G: PaymentGateway,
{
    store: S,
    pricing: P,
    tax: T,
    shipping: H,
    gateway: G,
    hold: Duration,
}

impl<S, P, T, H, G> CheckoutService<S, P, T, H, G>
where
    S: ReservationStore,
    P: PricingService,
    T: TaxService,
    H: ShippingService,
    G: PaymentGateway,
{
    /// Creates a coordinator whose reservations expire `hold_minutes`
    /// after each reconciliation pass.
    pub fn new(store: S, pricing: P, tax: T, shipping: H, gateway: G, hold_minutes: i64) -> Self {
        Self {
            store,
            pricing,
            tax,
            shipping,
            gateway,
            hold: Duration::minutes(hold_minutes),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Produces a payment intent for a session's current cart.
    ///
    /// Runs one reconciliation pass: after it succeeds, outstanding
    /// PENDING holds for the session exactly match the cart snapshot, and
    /// inventory reflects them. A failed pass leaves both stores exactly
    /// as they were.
    #[tracing::instrument(skip(self), fields(country, %currency))]
    pub async fn checkout_intent(
        &self,
        token: &SessionToken,
        country: &str,
        currency: Currency,
    ) -> Result<PaymentIntent, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();
        let now = Utc::now();

        let session = self
            .store
            .session_by_token(token)
            .await?
            .filter(|s| !s.is_expired(now))
            .ok_or(CheckoutError::SessionNotFound)?;

        let cart = self.store.cart_lines(session.id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        // Price the cart before touching the stores, so a pricing gap
        // cannot leave holds behind.
        let mut subtotal = Money::zero();
        for line in &cart {
            let unit = self.pricing.price_of(&line.sku, currency).await.ok_or(
                CheckoutError::PriceUnavailable {
                    sku: line.sku.clone(),
                    currency,
                },
            )?;
            subtotal = subtotal.add(unit.multiply(line.qty));
        }
        let tax = self.tax.rate_for(country).await;
        let shipping = self.shipping.cost_for(country, currency).await;
        let amount = subtotal.add(subtotal.apply_rate(tax.rate)).add(shipping);

        let reference = CheckoutRef::generate();
        let expires_at = now + self.hold;

        let outcome = self
            .store
            .reconcile(session.id, &cart, &reference, expires_at, now)
            .await?;
        tracing::info!(
            session = %session.id,
            %reference,
            reconciled = outcome.reconciled,
            released = outcome.released,
            "reservation ledger reconciled against cart"
        );

        metrics::counter!("checkout_intents_total").increment(1);
        metrics::histogram!("checkout_intent_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(PaymentIntent {
            reference,
            currency,
            amount,
            gateway_public_key: self.gateway.public_key().await,
        })
    }

    /// Writes a cart line, creating the session on first interaction.
    ///
    /// Performs a soft availability pre-check so the shopper learns about
    /// an empty shelf early; the authoritative check is the conditional
    /// decrement at reconcile time. A quantity of zero removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        token: &SessionToken,
        sku: &Sku,
        qty: u32,
    ) -> Result<Session, CheckoutError> {
        if qty == 0 {
            self.store.remove_cart_line(token, sku).await?;
            return self
                .store
                .session_by_token(token)
                .await?
                .ok_or(CheckoutError::SessionNotFound);
        }

        match self.store.available(sku).await? {
            None => return Err(CheckoutError::UnknownSku { sku: sku.clone() }),
            Some(available) if qty > available => {
                return Err(CheckoutError::OutOfStock { sku: sku.clone() });
            }
            Some(_) => {}
        }

        let session = self
            .store
            .upsert_cart_line(token, sku, qty, Duration::hours(SESSION_TTL_HOURS))
            .await?;
        Ok(session)
    }

    /// Removes a cart line if it exists.
    pub async fn remove_from_cart(
        &self,
        token: &SessionToken,
        sku: &Sku,
    ) -> Result<(), CheckoutError> {
        self.store.remove_cart_line(token, sku).await?;
        Ok(())
    }

    /// Payment succeeded: the reference's PENDING reservations become
    /// permanent order lines. Returns the number of rows confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(&self, reference: &CheckoutRef) -> Result<u64, CheckoutError> {
        let confirmed = self.store.confirm_reference(reference).await?;
        tracing::info!(%reference, confirmed, "payment confirmed");
        metrics::counter!("checkout_payments_confirmed_total").increment(confirmed);
        Ok(confirmed)
    }

    /// Payment failed or timed out: the reference's holds are released
    /// exactly as the expiry reaper would release them.
    #[tracing::instrument(skip(self))]
    pub async fn release_payment(&self, reference: &CheckoutRef) -> Result<u64, CheckoutError> {
        let released = self.store.release_reference(reference).await?;
        tracing::info!(%reference, released, "payment released");
        metrics::counter!("checkout_payments_released_total").increment(released);
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::StaticPaymentGateway;
    use crate::services::pricing::InMemoryPricingService;
    use crate::services::shipping::InMemoryShippingService;
    use crate::services::tax::FixedTaxService;
    use reservation_store::InMemoryReservationStore;

    type TestService = CheckoutService<
        InMemoryReservationStore,
        InMemoryPricingService,
        FixedTaxService,
        InMemoryShippingService,
        StaticPaymentGateway,
    >;

    fn sku(code: &str) -> Sku {
        Sku::new(code)
    }

    async fn test_service() -> TestService {
        let store = InMemoryReservationStore::new();
        store.insert_sku(&sku("SKU-001"), 10).await.unwrap();
        store.insert_sku(&sku("SKU-002"), 10).await.unwrap();

        let pricing = InMemoryPricingService::new();
        pricing
            .set_price("SKU-001", Currency::Usd, Money::from_minor(1000))
            .await;
        pricing
            .set_price("SKU-002", Currency::Usd, Money::from_minor(2500))
            .await;

        let shipping = InMemoryShippingService::new();
        shipping
            .set_default(Currency::Usd, Money::from_minor(2000))
            .await;

        CheckoutService::new(
            store,
            pricing,
            FixedTaxService::new("vat", 0.075),
            shipping,
            StaticPaymentGateway::new("pk_test_abc"),
            15,
        )
    }

    #[tokio::test]
    async fn checkout_intent_reserves_and_prices_the_cart() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 2).await.unwrap();

        let intent = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap();

        // 2 × 10.00 = 20.00; 7.5% tax = 1.50; shipping 20.00.
        assert_eq!(intent.amount, Money::from_minor(4350));
        assert_eq!(intent.currency, Currency::Usd);
        assert_eq!(intent.gateway_public_key, "pk_test_abc");
        assert_eq!(
            service.store().available(&sku("SKU-001")).await.unwrap(),
            Some(8)
        );
    }

    #[tokio::test]
    async fn checkout_intent_without_session_is_not_found() {
        let service = test_service().await;
        let err = service
            .checkout_intent(&SessionToken::new("missing"), "nigeria", Currency::Usd)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::SessionNotFound));
    }

    #[tokio::test]
    async fn checkout_intent_with_empty_cart_is_distinct_from_not_found() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 2).await.unwrap();
        service.add_to_cart(&token, &sku("SKU-001"), 0).await.unwrap();

        let err = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::CartEmpty));
    }

    #[tokio::test]
    async fn out_of_stock_names_the_sku_and_aborts_everything() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 4).await.unwrap();
        // Pre-check passes at 10 available, then another shopper takes 8.
        service.add_to_cart(&token, &sku("SKU-002"), 10).await.unwrap();
        service
            .store()
            .decrement_available(&sku("SKU-002"), 8)
            .await
            .unwrap();

        let err = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap_err();

        assert!(
            matches!(err, CheckoutError::OutOfStock { ref sku } if sku.as_str() == "SKU-002")
        );
        assert_eq!(
            service.store().available(&sku("SKU-001")).await.unwrap(),
            Some(10)
        );
    }

    #[tokio::test]
    async fn repeat_checkout_with_unchanged_cart_only_refreshes_reference() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 3).await.unwrap();

        let first = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap();
        let second = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap();

        assert_ne!(first.reference, second.reference);
        assert_eq!(first.amount, second.amount);
        assert_eq!(
            service.store().available(&sku("SKU-001")).await.unwrap(),
            Some(7)
        );
    }

    #[tokio::test]
    async fn add_to_cart_rejects_unknown_sku_and_oversized_quantity() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");

        let err = service
            .add_to_cart(&token, &sku("SKU-404"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::UnknownSku { .. }));

        let err = service
            .add_to_cart(&token, &sku("SKU-001"), 11)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OutOfStock { .. }));
    }

    #[tokio::test]
    async fn confirm_payment_fixes_the_hold_permanently() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 2).await.unwrap();

        let intent = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap();
        assert_eq!(service.confirm_payment(&intent.reference).await.unwrap(), 1);
        // Confirming again is a no-op.
        assert_eq!(service.confirm_payment(&intent.reference).await.unwrap(), 0);
        assert_eq!(
            service.store().available(&sku("SKU-001")).await.unwrap(),
            Some(8)
        );
    }

    #[tokio::test]
    async fn release_payment_returns_the_hold() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 2).await.unwrap();

        let intent = service
            .checkout_intent(&token, "nigeria", Currency::Usd)
            .await
            .unwrap();
        assert_eq!(service.release_payment(&intent.reference).await.unwrap(), 1);
        assert_eq!(
            service.store().available(&sku("SKU-001")).await.unwrap(),
            Some(10)
        );
    }

    #[tokio::test]
    async fn missing_price_fails_before_any_hold_is_taken() {
        let service = test_service().await;
        let token = SessionToken::new("cookie");
        service.add_to_cart(&token, &sku("SKU-001"), 2).await.unwrap();

        let err = service
            .checkout_intent(&token, "nigeria", Currency::Ngn)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PriceUnavailable { .. }));
        assert_eq!(
            service.store().available(&sku("SKU-001")).await.unwrap(),
            Some(10)
        );
    }
}
