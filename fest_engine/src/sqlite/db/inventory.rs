use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{InventoryRecord, ItemId, MerchantId},
    traits::{DecrementResult, LedgerError},
};

/// Compare-and-decrement. The `available_count >= $1` guard and the decrement are one statement, so concurrent callers
/// can never take the count below zero.
pub async fn decrement_if_available(
    merchant: &MerchantId,
    item: &ItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<DecrementResult, LedgerError> {
    if quantity < 1 {
        return Err(LedgerError::ValidationError(format!("Cannot decrement stock by {quantity}")));
    }
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE inventory
            SET available_count = available_count - $1, updated_at = $2
            WHERE merchant_id = $3 AND item_id = $4 AND available_count >= $1
            RETURNING available_count;
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(merchant)
    .bind(item)
    .fetch_optional(conn)
    .await?;
    match remaining {
        Some(remaining) => {
            trace!("🗃️ Stock for {merchant}/{item} decremented by {quantity}. {remaining} left");
            Ok(DecrementResult::Decremented(remaining))
        },
        None => {
            debug!("🗃️ Insufficient stock for {merchant}/{item} to take {quantity}");
            Ok(DecrementResult::Insufficient)
        },
    }
}

pub async fn increase_available(
    merchant: &MerchantId,
    item: &ItemId,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<InventoryRecord, LedgerError> {
    if quantity < 1 {
        return Err(LedgerError::ValidationError(format!("Cannot restock {quantity} units")));
    }
    let record = sqlx::query_as::<_, InventoryRecord>(
        r#"
            INSERT INTO inventory (merchant_id, item_id, available_count, updated_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (merchant_id, item_id) DO UPDATE
                SET available_count = available_count + excluded.available_count, updated_at = excluded.updated_at
            RETURNING merchant_id, item_id, available_count, updated_at;
        "#,
    )
    .bind(merchant)
    .bind(item)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Restocked {merchant}/{item} with {quantity} units. {} available", record.available_count);
    Ok(record)
}

pub async fn fetch_inventory(
    merchant: &MerchantId,
    item: &ItemId,
    conn: &mut SqliteConnection,
) -> Result<Option<InventoryRecord>, LedgerError> {
    let record = sqlx::query_as::<_, InventoryRecord>(
        r#"
            SELECT merchant_id, item_id, available_count, updated_at
            FROM inventory
            WHERE merchant_id = $1 AND item_id = $2
        "#,
    )
    .bind(merchant)
    .bind(item)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}
