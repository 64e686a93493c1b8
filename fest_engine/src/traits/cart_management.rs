use thiserror::Error;

use crate::db_types::{Cart, ItemId, MerchantId, UserId};

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid cart request: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        CartError::DatabaseError(e.to_string())
    }
}

/// Per (user, merchant) draft carts.
///
/// Every mutation returns the cart as it stands after the change, with the total re-derived from the line snapshots.
/// Carts never touch the inventory ledger. Stock is only claimed when an order is finalized.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Adds `quantity` units of `item` to the cart. If the line already exists, its quantity is increased. Otherwise,
    /// the current catalog price is snapshotted onto a new line.
    ///
    /// Returns [`CartError::NotFound`] if the item is not in the merchant's catalog.
    async fn add_item(
        &self,
        user: &UserId,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<Cart, CartError>;

    /// Applies `delta` to the line quantity. A resulting quantity of zero or less removes the line.
    ///
    /// Returns [`CartError::NotFound`] if the line does not exist.
    async fn change_quantity(
        &self,
        user: &UserId,
        merchant: &MerchantId,
        item: &ItemId,
        delta: i64,
    ) -> Result<Cart, CartError>;

    /// Deletes the line. Returns [`CartError::NotFound`] if it does not exist.
    async fn remove_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId) -> Result<Cart, CartError>;

    /// Empties the cart. Clearing an absent cart is not an error.
    async fn clear_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<(), CartError>;

    /// Fetches the cart. An empty cart is a valid result.
    async fn fetch_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CartError>;

    /// Fetches all the non-empty carts for the user, one per merchant.
    async fn fetch_carts_for_user(&self, user: &UserId) -> Result<Vec<Cart>, CartError>;
}
