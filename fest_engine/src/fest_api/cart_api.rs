//! Draft carts, one per (user, merchant).
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cart, ItemId, MerchantId, UserId, MAX_LINE_QUANTITY},
    traits::{CartError, CartManagement},
};

pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Adds `quantity` units of the item, snapshotting its current catalog price if the line is new.
    pub async fn add_item(
        &self,
        user: &UserId,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
            let msg = format!("Quantity must be between 1 and {MAX_LINE_QUANTITY}, not {quantity}");
            return Err(CartError::ValidationError(msg));
        }
        let cart = self.db.add_item(user, merchant, item, quantity).await?;
        debug!("🛒 {user} added {quantity} x {item} to their cart at {merchant}. Total {}", cart.total_price());
        Ok(cart)
    }

    /// Applies `delta` to a line. Lines that drop to zero or below are removed.
    pub async fn change_quantity(
        &self,
        user: &UserId,
        merchant: &MerchantId,
        item: &ItemId,
        delta: i64,
    ) -> Result<Cart, CartError> {
        if delta == 0 {
            return Err(CartError::ValidationError("Quantity change cannot be zero".into()));
        }
        if !(-MAX_LINE_QUANTITY..=MAX_LINE_QUANTITY).contains(&delta) {
            return Err(CartError::ValidationError(format!("Quantity change cannot exceed {MAX_LINE_QUANTITY}")));
        }
        let cart = self.db.change_quantity(user, merchant, item, delta).await?;
        debug!("🛒 {user} changed {item} by {delta} at {merchant}. Total {}", cart.total_price());
        Ok(cart)
    }

    pub async fn remove_item(&self, user: &UserId, merchant: &MerchantId, item: &ItemId) -> Result<Cart, CartError> {
        let cart = self.db.remove_item(user, merchant, item).await?;
        debug!("🛒 {user} removed {item} from their cart at {merchant}");
        Ok(cart)
    }

    /// Clearing an absent cart is not an error.
    pub async fn clear_cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CartError> {
        self.db.clear_cart(user, merchant).await?;
        debug!("🛒 {user} cleared their cart at {merchant}");
        Ok(Cart::empty(user.clone(), merchant.clone()))
    }

    pub async fn cart(&self, user: &UserId, merchant: &MerchantId) -> Result<Cart, CartError> {
        self.db.fetch_cart(user, merchant).await
    }

    /// All non-empty carts of the user.
    pub async fn carts(&self, user: &UserId) -> Result<Vec<Cart>, CartError> {
        self.db.fetch_carts_for_user(user).await
    }
}
