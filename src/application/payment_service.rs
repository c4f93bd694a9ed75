use std::sync::Arc;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use super::blocking;
use crate::domain::actor::{Actor, Role};
use crate::domain::errors::DomainError;
use crate::domain::payment::{PaymentIntent, PaymentReference};
use crate::domain::ports::{GatewayOrder, PaymentGateway, PaymentRepository};
use crate::payment::PaymentVerifier;

/// Gateway identifiers returned to the client after an online payment.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// A payment whose signature checked out against a gateway order this
/// service opened for the same customer.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub intent: PaymentIntent,
    pub payment_id: String,
}

impl VerifiedPayment {
    /// Holds the payment to the amount owed. A payment opened for a different
    /// amount does not settle the order.
    pub fn settle(self, grand_total: &BigDecimal) -> Result<PaymentReference, DomainError> {
        let due = PaymentService::amount_in_minor_units(grand_total)?;
        if self.intent.amount_minor != due {
            warn!(
                "Payment {} covers {} minor units but the order is due {due}",
                self.payment_id, self.intent.amount_minor
            );
            return Err(DomainError::PaymentNotVerified);
        }
        Ok(PaymentReference {
            gateway_order_id: self.intent.gateway_order_id,
            payment_id: self.payment_id,
        })
    }
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    intents: Arc<dyn PaymentRepository>,
    verifier: PaymentVerifier,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        intents: Arc<dyn PaymentRepository>,
        verifier: PaymentVerifier,
    ) -> Self {
        Self {
            gateway,
            intents,
            verifier,
        }
    }

    /// Amount in the currency's minor unit, for the payment gateway.
    pub fn amount_in_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
        (amount * BigDecimal::from(100))
            .with_scale(0)
            .to_i64()
            .ok_or_else(|| DomainError::invalid("amount", "Amount is out of range"))
    }

    /// Opens a gateway order and records which customer it was opened for
    /// and for how much.
    pub async fn open(
        &self,
        actor: &Actor,
        amount: &BigDecimal,
        receipt: Option<String>,
    ) -> Result<GatewayOrder, DomainError> {
        actor.require(Role::Customer, "start a payment")?;
        if *amount <= BigDecimal::from(0) {
            return Err(DomainError::invalid("amount", "Amount must be positive"));
        }
        let amount_minor = Self::amount_in_minor_units(amount)?;
        let receipt = receipt.unwrap_or_else(|| format!("rcpt_{}", Uuid::new_v4().simple()));

        let order = self.gateway.create_order(amount_minor, &receipt).await?;
        if order.amount != amount_minor {
            return Err(DomainError::Upstream(format!(
                "gateway opened {} for {} minor units, asked for {amount_minor}",
                order.id, order.amount
            )));
        }

        let intent = PaymentIntent {
            gateway_order_id: order.id.clone(),
            customer_id: actor.user_id,
            amount_minor,
            currency: order.currency.clone(),
            created_at: Utc::now(),
        };
        let intents = self.intents.clone();
        blocking(move || intents.record_intent(&intent)).await?;
        info!("Opened payment {} for {} ({amount_minor} minor units)", order.id, actor.user_id);
        Ok(order)
    }

    /// Checks the gateway signature and that the gateway order was opened
    /// here for `actor`.
    pub fn verify(&self, actor: &Actor, confirmation: &PaymentConfirmation) -> Result<VerifiedPayment, DomainError> {
        if !self.verifier.verify(
            &confirmation.gateway_order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        ) {
            warn!("Rejected payment {} with a bad signature", confirmation.payment_id);
            return Err(DomainError::PaymentNotVerified);
        }
        let intent = match self.intents.find_intent(&confirmation.gateway_order_id)? {
            Some(intent) if intent.customer_id == actor.user_id => intent,
            Some(_) => {
                warn!(
                    "Payment {} presented by {} belongs to another customer",
                    confirmation.payment_id, actor.user_id
                );
                return Err(DomainError::PaymentNotVerified);
            }
            None => {
                warn!("Payment {} refers to unknown gateway order {}", confirmation.payment_id, confirmation.gateway_order_id);
                return Err(DomainError::PaymentNotVerified);
            }
        };
        Ok(VerifiedPayment {
            intent,
            payment_id: confirmation.payment_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::infrastructure::memory::InMemoryStore;

    const SECRET: &str = "rzp_secret";

    /// Hands out sequential gateway order ids and echoes the amount unless
    /// told to short-change.
    #[derive(Default)]
    struct FakeGateway {
        opened: Mutex<u32>,
        short_change: bool,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_order(&self, amount_minor: i64, receipt: &str) -> Result<GatewayOrder, DomainError> {
            let mut opened = self.opened.lock().unwrap();
            *opened += 1;
            Ok(GatewayOrder {
                id: format!("order_{}", *opened),
                amount: if self.short_change { amount_minor - 1 } else { amount_minor },
                currency: "INR".to_string(),
                receipt: Some(receipt.to_string()),
            })
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn service_with(gateway: FakeGateway) -> PaymentService {
        PaymentService::new(Arc::new(gateway), Arc::new(InMemoryStore::new()), PaymentVerifier::new(SECRET))
    }

    fn customer() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Customer, "Asha")
    }

    fn confirmation(gateway_order_id: &str, payment_id: &str) -> PaymentConfirmation {
        PaymentConfirmation {
            gateway_order_id: gateway_order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: PaymentVerifier::new(SECRET).sign(gateway_order_id, payment_id).unwrap(),
        }
    }

    #[test]
    fn minor_units_round_to_paise() {
        assert_eq!(PaymentService::amount_in_minor_units(&dec("310.63")).unwrap(), 31063);
        assert_eq!(PaymentService::amount_in_minor_units(&dec("1")).unwrap(), 100);
    }

    #[tokio::test]
    async fn opened_payment_settles_only_its_own_amount() {
        let service = service_with(FakeGateway::default());
        let asha = customer();
        let opened = service.open(&asha, &dec("142.25"), None).await.unwrap();
        assert_eq!(opened.amount, 14225);

        let verified = service.verify(&asha, &confirmation(&opened.id, "pay_1")).unwrap();
        let err = verified.clone().settle(&dec("5642.50")).unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotVerified));

        let reference = verified.settle(&dec("142.25")).unwrap();
        assert_eq!(reference.gateway_order_id, opened.id);
        assert_eq!(reference.payment_id, "pay_1");
    }

    #[tokio::test]
    async fn signed_payment_for_an_unknown_gateway_order_is_refused() {
        let service = service_with(FakeGateway::default());
        let err = service.verify(&customer(), &confirmation("order_elsewhere", "pay_1")).unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotVerified));
    }

    #[tokio::test]
    async fn another_customers_payment_is_refused() {
        let service = service_with(FakeGateway::default());
        let opened = service.open(&customer(), &dec("100"), None).await.unwrap();

        let err = service.verify(&customer(), &confirmation(&opened.id, "pay_1")).unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotVerified));
    }

    #[tokio::test]
    async fn bad_signature_is_refused_before_any_lookup() {
        let service = service_with(FakeGateway::default());
        let asha = customer();
        let opened = service.open(&asha, &dec("100"), None).await.unwrap();
        let mut forged = confirmation(&opened.id, "pay_1");
        forged.payment_id = "pay_2".to_string();

        let err = service.verify(&asha, &forged).unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotVerified));
    }

    #[tokio::test]
    async fn gateway_amount_mismatch_is_an_upstream_failure() {
        let service = service_with(FakeGateway {
            short_change: true,
            ..Default::default()
        });
        let err = service.open(&customer(), &dec("100"), None).await.unwrap_err();
        assert!(matches!(err, DomainError::Upstream(_)));
    }

    #[tokio::test]
    async fn only_customers_open_positive_payments() {
        let service = service_with(FakeGateway::default());
        let driver = Actor::new(Uuid::new_v4(), Role::Driver, "Ravi");
        assert!(matches!(
            service.open(&driver, &dec("100"), None).await.unwrap_err(),
            DomainError::Forbidden(_)
        ));
        assert!(matches!(
            service.open(&customer(), &dec("0"), None).await.unwrap_err(),
            DomainError::InvalidInput { field: Some("amount"), .. }
        ));
    }
}
