//! The checkout pipeline.
//!
//! A checkout runs in two halves. The slow half (gateway signature checks, screenshot OCR) happens first, with no
//! storage transaction open. Only a verified proof moves on to the fast half, [`FulfillmentDatabase::finalize_order`],
//! which reserves stock, mints a token, writes the order and clears the cart atomically.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        Amount,
        Cart,
        CheckoutState,
        MerchantId,
        NewCheckoutAttempt,
        Order,
        OrderId,
        PaymentIntentRecord,
        UserId,
        VerificationStatus,
    },
    events::{EventProducers, OrderFinalizedEvent},
    fest_api::{
        checkout_objects::{CheckoutReceipt, CheckoutRequest},
        errors::CheckoutError,
    },
    proofs::{
        GatewayProof,
        PaymentGateway,
        PaymentIntent,
        PaymentProof,
        ProofVerifier,
        RejectionReason,
        VerificationOutcome,
    },
    traits::{FinalizeRequest, FinalizeResult, FulfillmentDatabase},
};

pub struct CheckoutApi<B, G, V> {
    db: B,
    gateway: G,
    verifier: V,
    producers: EventProducers,
    currency: String,
}

impl<B: Debug, G, V: Debug> Debug for CheckoutApi<B, G, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?}, {:?}, {})", self.db, self.verifier, self.currency)
    }
}

impl<B, G, V> CheckoutApi<B, G, V>
where
    B: FulfillmentDatabase,
    G: PaymentGateway,
    V: ProofVerifier,
{
    pub fn new(db: B, gateway: G, verifier: V, producers: EventProducers, currency: &str) -> Self {
        Self { db, gateway, verifier, producers, currency: currency.to_string() }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    async fn non_empty_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CheckoutError> {
        let cart = self.db.fetch_cart(user, merchant).await?;
        if cart.is_empty() {
            return Err(CheckoutError::Validation(format!("The cart at {merchant} is empty")));
        }
        ensure_payable(&cart)?;
        Ok(cart)
    }

    /// Creates a gateway payment intent for the current cart total. The amount always comes from the stored cart.
    pub async fn create_payment_intent(
        &self,
        user: &UserId,
        merchant: &MerchantId,
    ) -> Result<PaymentIntent, CheckoutError> {
        let cart = self.non_empty_cart(user, merchant).await?;
        let receipt = format!("{merchant}/{user}");
        let intent = self.gateway.create_intent(cart.total_price(), &self.currency, &receipt).await?;
        let record = PaymentIntentRecord {
            intent_id: intent.intent_id.clone(),
            user_id: user.clone(),
            merchant_id: merchant.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            created_at: chrono::Utc::now(),
        };
        self.db.insert_payment_intent(record).await?;
        info!("🧾 Payment intent {} created for {user} at {merchant} for {}", intent.intent_id, intent.amount);
        Ok(intent)
    }

    /// Runs a checkout to completion.
    ///
    /// A repeat of an already finalized checkout (same idempotency key) returns the original order with
    /// `duplicate: true` and has no further side effects.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt, CheckoutError> {
        request.proof.validate().map_err(CheckoutError::Validation)?;
        let key = request.effective_idempotency_key().map_err(CheckoutError::Validation)?;
        let user = &request.user_id;
        let merchant = &request.merchant_id;
        trace!("📦 Checkout [{key}] for {user} at {merchant} initiated");

        if let Some(order) = self.db.fetch_order_by_idempotency_key(&key).await? {
            return duplicate_receipt(&request, &key, &order);
        }

        let cart = self.db.fetch_cart(user, merchant).await?;
        if cart.is_empty() {
            // A concurrent duplicate may have finalized and cleared the cart since the first check
            if let Some(order) = self.db.fetch_order_by_idempotency_key(&key).await? {
                return duplicate_receipt(&request, &key, &order);
            }
            return Err(CheckoutError::Validation(format!("The cart at {merchant} is empty")));
        }
        ensure_payable(&cart)?;
        let total = cart.total_price();
        match request.client_total {
            Some(client_total) if client_total != total => {
                warn!("📦 Checkout [{key}]: client believes the total is {client_total}, but the cart comes to {total}")
            },
            _ => {},
        }

        trace!("📦 Checkout [{key}] proof submitted ({})", request.proof.kind());
        let outcome = match self.verifier.verify(&request.proof).await {
            VerificationOutcome::Verified => match &request.proof {
                PaymentProof::Gateway(p) => self.check_intent_binding(p, &cart).await?,
                _ => VerificationOutcome::Verified,
            },
            other => other,
        };
        let reason = match &outcome {
            VerificationOutcome::Verified => None,
            VerificationOutcome::Rejected(r) => Some(r.to_string()),
            VerificationOutcome::Error(e) => Some(e.to_string()),
        };
        match outcome {
            VerificationOutcome::Verified => {},
            VerificationOutcome::Rejected(r) => {
                info!("📦 Checkout [{key}] rejected. {r}");
                self.audit(&request, &key, CheckoutState::Rejected, reason, total, None).await;
                return Err(r.into());
            },
            VerificationOutcome::Error(e) => {
                warn!("📦 Checkout [{key}] could not verify the proof. {e}");
                self.audit(&request, &key, CheckoutState::Error, reason, total, None).await;
                return Err(CheckoutError::Proof(e));
            },
        }

        let finalize = FinalizeRequest {
            user_id: user.clone(),
            merchant_id: merchant.clone(),
            idempotency_key: key.clone(),
            proof_kind: request.proof.kind(),
            proof_reference: request.proof.reference(),
            verification_status: VerificationStatus::Verified,
            lines: cart.lines,
        };
        match self.db.finalize_order(finalize).await? {
            FinalizeResult::Finalized(order) => {
                self.audit(&request, &key, CheckoutState::CartCleared, None, order.total_amount, Some(order.id)).await;
                info!(
                    "📦 Checkout [{key}] complete. Order {} has token {} at {merchant}",
                    order.id, order.human_token
                );
                self.producers.publish_order_finalized(OrderFinalizedEvent::new(&order)).await;
                Ok(CheckoutReceipt::new(&order, false))
            },
            FinalizeResult::AlreadyFinalized(order) => duplicate_receipt(&request, &key, &order),
            FinalizeResult::Insufficient(item) => {
                let reason = Some(format!("{item} is out of stock"));
                self.audit(&request, &key, CheckoutState::Verified, reason, total, None).await;
                Err(CheckoutError::OutOfStock(item))
            },
            FinalizeResult::CartChanged => {
                let reason = Some("The cart changed during checkout".to_string());
                self.audit(&request, &key, CheckoutState::Verified, reason, total, None).await;
                let msg = "The cart changed during checkout. Please review it and try again";
                Err(CheckoutError::Validation(msg.into()))
            },
        }
    }

    /// A validly signed gateway payment must also be for an intent this server created for the same user, merchant
    /// and cart total.
    async fn check_intent_binding(
        &self,
        proof: &GatewayProof,
        cart: &Cart,
    ) -> Result<VerificationOutcome, CheckoutError> {
        let Some(intent) = self.db.fetch_payment_intent(&proof.intent_id).await? else {
            return Ok(VerificationOutcome::Rejected(RejectionReason::UnknownIntent));
        };
        let mismatch = if intent.user_id != cart.user_id {
            Some("it was created for another user".to_string())
        } else if intent.merchant_id != cart.merchant_id {
            Some(format!("it was created for {}", intent.merchant_id))
        } else if intent.amount != cart.total_price() {
            Some(format!("it is for {}, but the cart comes to {}", intent.amount, cart.total_price()))
        } else {
            None
        };
        Ok(match mismatch {
            Some(m) => VerificationOutcome::Rejected(RejectionReason::IntentMismatch(m)),
            None => VerificationOutcome::Verified,
        })
    }

    /// Audit records are best effort. A failure to write one never fails the checkout.
    async fn audit(
        &self,
        request: &CheckoutRequest,
        key: &str,
        state: CheckoutState,
        reason: Option<String>,
        total_amount: Amount,
        order_id: Option<OrderId>,
    ) {
        let verification_status = match state {
            CheckoutState::Rejected => VerificationStatus::Rejected,
            CheckoutState::Error => VerificationStatus::Error,
            _ => VerificationStatus::Verified,
        };
        let attempt = NewCheckoutAttempt {
            idempotency_key: key.to_string(),
            user_id: request.user_id.clone(),
            merchant_id: request.merchant_id.clone(),
            proof_kind: request.proof.kind(),
            verification_status,
            state,
            reason,
            total_amount,
            order_id,
        };
        if let Err(e) = self.db.record_checkout_attempt(attempt).await {
            error!("📦 Could not write the audit record for checkout [{key}]. {e}");
        }
    }
}

/// Only carts with a positive total can be paid for.
fn ensure_payable(cart: &Cart) -> Result<(), CheckoutError> {
    if cart.total_price().is_positive() {
        Ok(())
    } else {
        let msg = format!("The cart total at {} is {}, which cannot be paid", cart.merchant_id, cart.total_price());
        Err(CheckoutError::Validation(msg))
    }
}

fn duplicate_receipt(request: &CheckoutRequest, key: &str, order: &Order) -> Result<CheckoutReceipt, CheckoutError> {
    if order.user_id != request.user_id || order.merchant_id != request.merchant_id {
        warn!("📦 Checkout [{key}] by {} collides with order {} of another checkout", request.user_id, order.id);
        return Err(CheckoutError::Validation("This payment has already been used for another order".into()));
    }
    debug!("📦 Checkout [{key}] was already finalized as order {}", order.id);
    Ok(CheckoutReceipt::new(order, true))
}
