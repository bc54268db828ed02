use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{AppError, Result};

const ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

type HmacSha256 = Hmac<Sha256>;

/// An order created at the payment gateway. Amounts are in paise.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct Order {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: Option<String>,
}

/// Client for the external payment gateway: creates orders and verifies the
/// signed confirmations it returns.
#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    key_id: String,
    key_secret: Zeroizing<String>,
}

impl PaymentGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
        }
    }

    /// Creates an order for a catalog item. `amount` is in rupees.
    ///
    /// # Arguments
    ///
    /// * `amount` - The price in whole rupees.
    /// * `item_id` - The course or note id the order is for.
    ///
    /// # Returns
    ///
    /// A `Result` containing the gateway's `Order`.
    pub async fn create_order(&self, amount: i64, item_id: &str) -> Result<Order> {
        let payload = sonic_rs::json!({
            "amount": amount * 100,
            "currency": "INR",
            "receipt": format!("receipt_{}_{}", item_id, Utc::now().timestamp_millis()),
        });

        let response = self
            .client
            .post(ORDERS_URL)
            .basic_auth(&self.key_id, Some(self.key_secret.as_str()))
            .header("content-type", "application/json")
            .body(sonic_rs::to_string(&payload).map_err(|e| AppError::Gateway(e.to_string()))?)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Order creation failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Gateway returned {}: {}",
                status, body
            )));
        }

        response
            .json::<Order>()
            .await
            .map_err(|e| AppError::Gateway(format!("Malformed order response: {}", e)))
    }

    /// Verifies a payment confirmation: HMAC-SHA256 over
    /// `"{order_id}|{payment_id}"`, hex-encoded, compared in constant time.
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let expected = self.expected_signature(order_id, payment_id);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }

    fn expected_signature(&self, order_id: &str, payment_id: &str) -> String {
        // The key is accepted at any length by HMAC; construction cannot fail.
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(secret: &str) -> PaymentGateway {
        PaymentGateway {
            client: reqwest::Client::new(),
            key_id: "rzp_test".to_string(),
            key_secret: Zeroizing::new(secret.to_string()),
        }
    }

    #[test]
    fn accepts_the_gateway_signature() {
        let g = gateway("test_secret");
        let sig = g.expected_signature("order_123", "pay_456");

        assert!(g.verify_signature("order_123", "pay_456", &sig));
    }

    #[test]
    fn rejects_tampered_ids_and_signatures() {
        let g = gateway("test_secret");
        let sig = g.expected_signature("order_123", "pay_456");

        assert!(!g.verify_signature("order_999", "pay_456", &sig));
        assert!(!g.verify_signature("order_123", "pay_999", &sig));
        assert!(!g.verify_signature("order_123", "pay_456", "deadbeef"));
    }

    #[test]
    fn signature_depends_on_the_secret() {
        let a = gateway("secret_a").expected_signature("order_123", "pay_456");
        let b = gateway("secret_b").expected_signature("order_123", "pay_456");

        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
