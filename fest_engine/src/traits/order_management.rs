use crate::{
    db_types::{MerchantId, Order, OrderId},
    traits::{FulfillmentError, OrderQueryFilter},
};

/// Read access to finalized orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order, including its line items.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, FulfillmentError>;

    async fn fetch_order_by_idempotency_key(&self, key: &str) -> Result<Option<Order>, FulfillmentError>;

    /// Fetches the orders matching the filter, oldest first. Line items are included.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, FulfillmentError>;

    /// Sets the one-time `fulfilled` flag on an order belonging to `merchant`.
    ///
    /// Returns [`FulfillmentError::AlreadyFulfilled`] if the flag is already set.
    async fn mark_fulfilled(&self, merchant: &MerchantId, id: OrderId) -> Result<Order, FulfillmentError>;
}
