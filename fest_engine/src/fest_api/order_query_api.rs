use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{MerchantId, Order, OrderId, UserId},
    events::{EventProducers, OrderFulfilledEvent},
    traits::{FulfillmentError, OrderManagement, OrderQueryFilter},
};

/// Read access to finalized orders, for buyers and for merchant staff at the counter.
pub struct OrderQueryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi ({:?})", self.db)
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn orders_for_user(&self, user: &UserId) -> Result<Vec<Order>, FulfillmentError> {
        self.db.search_orders(OrderQueryFilter::default().with_user_id(user.clone())).await
    }

    /// Returns the order only if it belongs to `user`. Other users' orders look exactly like missing ones.
    pub async fn order_for_user(&self, user: &UserId, id: OrderId) -> Result<Option<Order>, FulfillmentError> {
        let order = self.db.fetch_order(id).await?;
        Ok(order.filter(|o| &o.user_id == user))
    }

    pub async fn orders_for_merchant(
        &self,
        merchant: &MerchantId,
        fulfilled: Option<bool>,
    ) -> Result<Vec<Order>, FulfillmentError> {
        let mut query = OrderQueryFilter::default().with_merchant_id(merchant.clone());
        query.fulfilled = fulfilled;
        self.db.search_orders(query).await
    }

    /// Marks the order as handed over. This can happen only once per order.
    pub async fn mark_fulfilled(&self, merchant: &MerchantId, id: OrderId) -> Result<Order, FulfillmentError> {
        let order = self.db.mark_fulfilled(merchant, id).await?;
        info!("📦 Order {id} (token {}) at {merchant} has been fulfilled", order.human_token);
        self.producers.publish_order_fulfilled(OrderFulfilledEvent::new(&order)).await;
        Ok(order)
    }
}
