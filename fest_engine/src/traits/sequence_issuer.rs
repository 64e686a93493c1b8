use crate::{
    db_types::{IssuedToken, MerchantId, SequenceCounter},
    traits::LedgerError,
};

/// Per-merchant monotonically increasing counter for human-facing order tokens.
///
/// Within an epoch, every issued value is strictly greater than all values issued before it for the same merchant.
/// Gaps are allowed (a rolled back finalize transaction gives its value back), duplicates are not.
#[allow(async_fn_in_trait)]
pub trait SequenceIssuer {
    /// Atomically increments the merchant's counter and returns the new value.
    async fn next_token(&self, merchant: &MerchantId) -> Result<IssuedToken, LedgerError>;

    /// Sets the counter back to zero and starts a new epoch.
    ///
    /// Finalize transactions that are already in flight are not affected, so a reset is only eventually consistent
    /// with concurrent checkouts. The epoch keeps tokens from either side of the reset distinct.
    async fn reset_sequence(&self, merchant: &MerchantId) -> Result<SequenceCounter, LedgerError>;

    async fn fetch_sequence(&self, merchant: &MerchantId) -> Result<Option<SequenceCounter>, LedgerError>;
}
