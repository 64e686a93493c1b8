use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Amount, MerchantId, Order, OrderId, UserId};

/// Emitted once for every newly materialized order, after its transaction has committed. Duplicate checkouts that
/// resolve to an existing order do not emit a second event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFinalizedEvent {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub human_token: i64,
    pub token_epoch: i64,
    pub user_id: UserId,
    pub total_amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl OrderFinalizedEvent {
    pub fn new(order: &Order) -> Self {
        Self {
            order_id: order.id,
            merchant_id: order.merchant_id.clone(),
            human_token: order.human_token,
            token_epoch: order.token_epoch,
            user_id: order.user_id.clone(),
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}

/// Emitted when staff hand over an order at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFulfilledEvent {
    pub order_id: OrderId,
    pub merchant_id: MerchantId,
    pub human_token: i64,
}

impl OrderFulfilledEvent {
    pub fn new(order: &Order) -> Self {
        Self { order_id: order.id, merchant_id: order.merchant_id.clone(), human_token: order.human_token }
    }
}
