use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fest_common::{Amount, Secret};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize gateway client: {0}")]
    Initialization(String),
    #[error("Payment gateway is unavailable: {0}")]
    Unavailable(String),
    #[error("Payment gateway returned error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not read payment gateway response: {0}")]
    InvalidResponse(String),
}

/// A payment intent (the gateway's "order") created for a cart total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub intent_id: String,
    /// What the client needs to open the gateway's checkout widget for this intent
    pub client_secret: String,
    pub amount: Amount,
    pub currency: String,
}

/// The external payment processor.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Creates a payment intent for `amount` with the processor. `receipt` is an opaque reference the processor shows
    /// on its dashboard.
    async fn create_intent(&self, amount: Amount, currency: &str, receipt: &str)
        -> Result<PaymentIntent, GatewayError>;
}

#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    /// e.g. `https://api.razorpay.com`
    pub base_url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub timeout: Duration,
}

/// REST client for Razorpay-style gateways: `POST {base_url}/v1/orders` with HTTP basic auth.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    client: Arc<Client>,
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
    #[serde(default)]
    client_secret: Option<String>,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }
}

impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        amount: Amount,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = self.url("/v1/orders");
        trace!("🧾 Creating payment intent for {amount} {currency} at {url}");
        let body = CreateOrderRequest { amount: amount.value(), currency, receipt };
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            warn!("🧾 Payment gateway refused to create an intent. {status}: {message}");
            return Err(GatewayError::Rejected { status, message });
        }
        let order =
            response.json::<CreateOrderResponse>().await.map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        debug!("🧾 Payment intent {} created for {amount} {currency}", order.id);
        Ok(PaymentIntent {
            intent_id: order.id,
            client_secret: order.client_secret.unwrap_or_else(|| self.config.key_id.clone()),
            amount,
            currency: currency.to_string(),
        })
    }
}
