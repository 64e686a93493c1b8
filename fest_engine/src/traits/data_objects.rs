use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{lines_total, Amount, CartLine, ItemId, MerchantId, Order, ProofKind, UserId, VerificationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementResult {
    /// The stock was decremented. Holds the remaining available count.
    Decremented(i64),
    Insufficient,
}

/// Everything the finalize transaction needs. The proof must already have been verified.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub idempotency_key: String,
    pub proof_kind: ProofKind,
    pub proof_reference: String,
    pub verification_status: VerificationStatus,
    /// The cart lines the proof was verified against. If the stored cart no longer matches these, finalize backs out.
    pub lines: Vec<CartLine>,
}

impl FinalizeRequest {
    /// `None` if the total does not fit in an [`Amount`].
    pub fn total_amount(&self) -> Option<Amount> {
        lines_total(&self.lines)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeResult {
    /// A new order was created. Stock was decremented, a token issued and the cart cleared.
    Finalized(Order),
    /// An order already exists for the idempotency key. Nothing was changed.
    AlreadyFinalized(Order),
    /// The item did not have enough stock. Nothing was changed.
    Insufficient(ItemId),
    /// The stored cart differs from the lines the proof was verified against. Nothing was changed.
    CartChanged,
}

/// Query filter for order searches. Conditions are combined with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub user_id: Option<UserId>,
    pub merchant_id: Option<MerchantId>,
    pub fulfilled: Option<bool>,
    pub since: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_merchant_id(mut self, merchant_id: MerchantId) -> Self {
        self.merchant_id = Some(merchant_id);
        self
    }

    pub fn with_fulfilled(mut self, fulfilled: bool) -> Self {
        self.fulfilled = Some(fulfilled);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.merchant_id.is_none() && self.fulfilled.is_none() && self.since.is_none()
    }
}
