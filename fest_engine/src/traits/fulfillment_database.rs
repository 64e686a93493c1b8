use thiserror::Error;

use crate::{
    db_types::{CheckoutAttempt, NewCheckoutAttempt, OrderId, PaymentIntentRecord},
    traits::{CartError, CartManagement, FinalizeRequest, FinalizeResult, LedgerError, OrderManagement},
};

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} has already been fulfilled")]
    AlreadyFulfilled(OrderId),
    #[error("Payment intent {0} already exists")]
    DuplicateIntent(String),
    #[error("Invalid finalize request: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}

impl From<CartError> for FulfillmentError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(s) => FulfillmentError::DatabaseError(s),
            CartError::NotFound(s) | CartError::ValidationError(s) => FulfillmentError::ValidationError(s),
        }
    }
}

impl From<LedgerError> for FulfillmentError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DatabaseError(s) => FulfillmentError::DatabaseError(s),
            LedgerError::NotFound(s) | LedgerError::ValidationError(s) => FulfillmentError::ValidationError(s),
        }
    }
}

/// The highest level contract for backends supporting the fulfillment pipeline.
///
/// This covers:
/// * the all-or-nothing finalize transaction,
/// * the checkout audit trail,
/// * bookkeeping for gateway payment intents.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone + CartManagement + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Materializes an order from a verified proof, in a single storage transaction:
    /// * every cart line is decremented from the inventory ledger with an atomic compare-and-decrement,
    /// * the stored cart is checked against `request.lines`,
    /// * the idempotency key is checked,
    /// * one token is issued from the merchant's sequence,
    /// * the order and its lines are written,
    /// * the cart is cleared.
    ///
    /// If any step fails, the whole transaction is rolled back. No stock is decremented and no token is consumed.
    /// If an order already exists for the idempotency key, it is returned as [`FinalizeResult::AlreadyFinalized`].
    async fn finalize_order(&self, request: FinalizeRequest) -> Result<FinalizeResult, FulfillmentError>;

    /// Writes an audit record for a checkout attempt. Returns the record id.
    async fn record_checkout_attempt(&self, attempt: NewCheckoutAttempt) -> Result<i64, FulfillmentError>;

    /// Fetches the audit records for an idempotency key, oldest first.
    async fn fetch_checkout_attempts(&self, idempotency_key: &str) -> Result<Vec<CheckoutAttempt>, FulfillmentError>;

    async fn insert_payment_intent(&self, intent: PaymentIntentRecord) -> Result<(), FulfillmentError>;

    async fn fetch_payment_intent(&self, intent_id: &str) -> Result<Option<PaymentIntentRecord>, FulfillmentError>;

    async fn close(&mut self) -> Result<(), FulfillmentError>;
}
