use thiserror::Error;

use crate::{
    db_types::{ItemId, VerificationStatus},
    proofs::{GatewayError, ProofError, RejectionReason},
    traits::{CartError, FulfillmentError, LedgerError},
};

/// Everything that can go wrong between "please check out my cart" and a materialized order.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Payment gateway is unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("{0}")]
    Proof(ProofError),
    #[error("Gateway signature does not match")]
    SignatureMismatch,
    #[error("Payment proof was rejected: {0}")]
    ProofRejected(RejectionReason),
    #[error("{0} does not have enough stock left")]
    OutOfStock(ItemId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CheckoutError {
    /// The verification status to report alongside the error, if verification got that far.
    pub fn verification_status(&self) -> Option<VerificationStatus> {
        match self {
            CheckoutError::Proof(_) => Some(VerificationStatus::Error),
            CheckoutError::SignatureMismatch | CheckoutError::ProofRejected(_) => Some(VerificationStatus::Rejected),
            CheckoutError::OutOfStock(_) => Some(VerificationStatus::Verified),
            _ => None,
        }
    }
}

impl From<RejectionReason> for CheckoutError {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::SignatureMismatch => CheckoutError::SignatureMismatch,
            other => CheckoutError::ProofRejected(other),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(e: GatewayError) -> Self {
        CheckoutError::GatewayUnavailable(e.to_string())
    }
}

impl From<CartError> for CheckoutError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(s) => CheckoutError::DatabaseError(s),
            CartError::NotFound(s) => CheckoutError::NotFound(s),
            CartError::ValidationError(s) => CheckoutError::Validation(s),
        }
    }
}

impl From<LedgerError> for CheckoutError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DatabaseError(s) => CheckoutError::DatabaseError(s),
            LedgerError::NotFound(s) => CheckoutError::NotFound(s),
            LedgerError::ValidationError(s) => CheckoutError::Validation(s),
        }
    }
}

impl From<FulfillmentError> for CheckoutError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::DatabaseError(s) => CheckoutError::DatabaseError(s),
            FulfillmentError::OrderNotFound(id) => CheckoutError::NotFound(format!("Order {id}")),
            FulfillmentError::ValidationError(s) => CheckoutError::Validation(s),
            e @ (FulfillmentError::AlreadyFulfilled(_) | FulfillmentError::DuplicateIntent(_)) => {
                CheckoutError::Validation(e.to_string())
            },
        }
    }
}
