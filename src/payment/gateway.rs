//! Razorpay orders API client.
//!
//! The workflow talks to the processor through the [`PaymentGateway`] trait
//! so tests can swap in a stub. Failures are surfaced to the caller and
//! never retried here: a blind retry could mint a duplicate remote order.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("amount {0} is not representable in minor units")]
    InvalidAmount(Decimal),

    #[error("payment processor rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("payment processor unreachable: {0}")]
    Network(String),
}

/// The processor's pending-charge record, referenced from the local order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RemoteOrder {
    pub id: String,
    /// Amount in the processor's minor unit (paise for INR).
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Mint a processor-side order. `amount` is already in minor units;
    /// `receipt` carries the local order id so the two systems stay
    /// correlatable.
    async fn create_remote_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError>;
}

/// Convert a decimal major-unit total into the processor's minor unit.
/// Rejects negatives and amounts with sub-minor-unit precision.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    let minor = amount * Decimal::ONE_HUNDRED;
    if minor.is_sign_negative() || !minor.fract().is_zero() {
        return Err(GatewayError::InvalidAmount(amount));
    }
    minor.to_i64().ok_or(GatewayError::InvalidAmount(amount))
}

pub struct RazorpayGateway {
    key_id: String,
    key_secret: String,
    base_url: String,
    agent: ureq::Agent,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self::with_base_url(key_id, key_secret, RAZORPAY_API_BASE.to_string())
    }

    pub fn with_base_url(key_id: String, key_secret: String, base_url: String) -> Self {
        Self {
            key_id,
            key_secret,
            base_url,
            agent: ureq::agent(),
        }
    }

    fn auth_header(&self) -> String {
        let token = BASE64.encode(format!("{}:{}", self.key_id, self.key_secret));
        format!("Basic {token}")
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_remote_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let auth = self.auth_header();
        let agent = self.agent.clone();
        let body = serde_json::json!({
            "amount": amount,
            "currency": currency,
            "receipt": receipt,
        });

        // ureq is blocking; keep it off the async runtime.
        let remote = tokio::task::spawn_blocking(move || {
            agent
                .post(&url)
                .set("Authorization", &auth)
                .send_json(body)
                .map_err(|err| match err {
                    ureq::Error::Status(status, resp) => GatewayError::Rejected {
                        status,
                        body: resp.into_string().unwrap_or_default(),
                    },
                    ureq::Error::Transport(transport) => {
                        GatewayError::Network(transport.to_string())
                    }
                })?
                .into_json::<RemoteOrder>()
                .map_err(|err| GatewayError::Network(format!("malformed response: {err}")))
        })
        .await
        .map_err(|err| GatewayError::Network(format!("request task failed: {err}")))??;

        Ok(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn whole_rupees_convert_to_paise() {
        assert_eq!(to_minor_units(dec!(20.00)).unwrap(), 2000);
        assert_eq!(to_minor_units(dec!(0)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(999.99)).unwrap(), 99999);
    }

    #[test]
    fn sub_paise_precision_is_rejected() {
        assert!(matches!(
            to_minor_units(dec!(10.005)),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(matches!(
            to_minor_units(dec!(-1)),
            Err(GatewayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn remote_order_parses_processor_response() {
        // Razorpay returns more fields than we keep; extras are ignored.
        let raw = r#"{
            "id": "order_IluGWxBm9U8zJ8",
            "amount": 2000,
            "currency": "INR",
            "receipt": "b2f7a25e",
            "status": "created"
        }"#;
        let remote: RemoteOrder = serde_json::from_str(raw).unwrap();
        assert_eq!(remote.id, "order_IluGWxBm9U8zJ8");
        assert_eq!(remote.amount, 2000);
        assert_eq!(remote.currency, "INR");
    }
}
