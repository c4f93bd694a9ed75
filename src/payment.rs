//! Bridge to the external payment gateway (Razorpay-compatible API).

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::PaymentConfig;
use crate::domain::errors::DomainError;
use crate::domain::ports::{GatewayOrder, PaymentGateway};

type Signer = Hmac<Sha256>;

/// Checks gateway payment signatures: lowercase hex HMAC-SHA256 of
/// `"<gateway_order_id>|<payment_id>"` keyed with the account secret.
#[derive(Clone)]
pub struct PaymentVerifier {
    secret: String,
}

impl PaymentVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// `false` on any mismatch or decoding problem. An empty secret never
    /// verifies anything.
    pub fn verify(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        if self.secret.is_empty() {
            warn!("Payment verification attempted without a configured secret");
            return false;
        }
        let Ok(expected) = hex::decode(signature.trim()) else {
            debug!("Payment signature for {gateway_order_id} is not valid hex");
            return false;
        };
        let Ok(mut mac) = Signer::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> Option<String> {
        let mut mac = Signer::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
    #[serde(default)]
    receipt: Option<String>,
}

pub struct RazorpayGateway {
    client: Client,
    config: PaymentConfig,
}

impl RazorpayGateway {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

fn upstream(e: impl std::fmt::Display) -> DomainError {
    DomainError::Upstream(format!("payment gateway: {e}"))
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, amount_minor: i64, receipt: &str) -> Result<GatewayOrder, DomainError> {
        let url = format!("{}/orders", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&CreateOrderRequest {
                amount: amount_minor,
                currency: &self.config.currency,
                receipt,
            })
            .send()
            .await
            .map_err(upstream)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!("Payment gateway refused order creation ({status}): {message}");
            return Err(upstream(format!("status {status}")));
        }

        let created: CreateOrderResponse = response.json().await.map_err(upstream)?;
        info!("Created gateway order {} for {amount_minor}", created.id);
        Ok(GatewayOrder {
            id: created.id,
            amount: created.amount,
            currency: created.currency,
            receipt: created.receipt,
        })
    }
}
