use thiserror::Error;

use crate::{
    db_types::{InventoryRecord, ItemId, MerchantId},
    traits::DecrementResult,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid ledger request: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// Remaining sellable quantity per (merchant, item).
///
/// `available_count` never drops below zero. Implementations must make [`decrement_if_available`] a single atomic
/// compare-and-decrement at the storage layer, and never a read followed by a write in application code.
///
/// [`decrement_if_available`]: InventoryLedger::decrement_if_available
#[allow(async_fn_in_trait)]
pub trait InventoryLedger {
    /// Decrements the available count by `quantity` if, and only if, at least `quantity` units are available.
    /// A missing record is treated as zero stock.
    async fn decrement_if_available(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<DecrementResult, LedgerError>;

    /// Administrative restock. Creates the inventory record if it does not exist yet.
    async fn increase_available(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<InventoryRecord, LedgerError>;

    async fn fetch_inventory(&self, merchant: &MerchantId, item: &ItemId)
        -> Result<Option<InventoryRecord>, LedgerError>;
}
