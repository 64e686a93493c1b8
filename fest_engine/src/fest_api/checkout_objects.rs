use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, MerchantId, Order, OrderId, UserId, VerificationStatus},
    proofs::PaymentProof,
};

/// A checkout request from an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub proof: PaymentProof,
    /// Client supplied request id. Gateway proofs are keyed on the gateway payment id instead.
    pub idempotency_key: Option<String>,
    /// What the client believes the total to be. Display hint only.
    pub client_total: Option<Amount>,
}

impl CheckoutRequest {
    pub fn new(user_id: UserId, merchant_id: MerchantId, proof: PaymentProof) -> Self {
        Self { user_id, merchant_id, proof, idempotency_key: None, client_total: None }
    }

    pub fn with_idempotency_key<S: Into<String>>(mut self, key: S) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_client_total(mut self, total: Amount) -> Self {
        self.client_total = Some(total);
        self
    }

    /// The key under which duplicate attempts collapse.
    ///
    /// * gateway proofs: `gateway:{external_payment_id}`
    /// * manual proofs: `manual:{user}:{key}`, where the key defaults to the declared transaction reference
    /// * counter cash: `counter:{user}:{key}`. The client must supply a key.
    pub fn effective_idempotency_key(&self) -> Result<String, String> {
        let client_key = self.idempotency_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
        match (&self.proof, client_key) {
            (PaymentProof::Gateway(p), _) => Ok(format!("gateway:{}", p.external_payment_id.trim())),
            (PaymentProof::Manual(_), Some(key)) => Ok(format!("manual:{}:{key}", self.user_id)),
            (PaymentProof::Manual(p), None) => {
                Ok(format!("manual:{}:{}", self.user_id, p.declared_txn_ref.split_whitespace().collect::<String>()))
            },
            (PaymentProof::CounterCash(_), Some(key)) => Ok(format!("counter:{}:{key}", self.user_id)),
            (PaymentProof::CounterCash(_), None) => Err("idempotency_key is required for counter cash".to_string()),
        }
    }
}

/// What a successful (or duplicate) checkout returns to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub human_token: i64,
    pub token_epoch: i64,
    pub verification_status: VerificationStatus,
    pub total_amount: Amount,
    pub duplicate: bool,
}

impl CheckoutReceipt {
    pub fn new(order: &Order, duplicate: bool) -> Self {
        Self {
            order_id: order.id,
            human_token: order.human_token,
            token_epoch: order.token_epoch,
            verification_status: order.verification_status,
            total_amount: order.total_amount,
            duplicate,
        }
    }
}
