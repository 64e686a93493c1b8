use chrono::Utc;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CatalogItem, ItemId, Merchant, MerchantId, NewCatalogItem, NewMerchant},
    traits::LedgerError,
};

pub async fn upsert_merchant(merchant: NewMerchant, conn: &mut SqliteConnection) -> Result<Merchant, LedgerError> {
    let merchant = sqlx::query_as::<_, Merchant>(
        r#"
            INSERT INTO merchants (id, kind, name, created_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET kind = excluded.kind, name = excluded.name
            RETURNING id, kind, name, created_at;
        "#,
    )
    .bind(merchant.id)
    .bind(merchant.kind)
    .bind(merchant.name)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Merchant {} ({}) saved", merchant.id, merchant.kind);
    Ok(merchant)
}

pub async fn fetch_merchant(id: &MerchantId, conn: &mut SqliteConnection) -> Result<Option<Merchant>, LedgerError> {
    let merchant = sqlx::query_as::<_, Merchant>("SELECT id, kind, name, created_at FROM merchants WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(merchant)
}

pub async fn upsert_catalog_item(
    item: NewCatalogItem,
    conn: &mut SqliteConnection,
) -> Result<CatalogItem, LedgerError> {
    if item.unit_price.value() < 0 {
        return Err(LedgerError::ValidationError(format!("Item {} cannot have a negative price", item.item_id)));
    }
    let item = sqlx::query_as::<_, CatalogItem>(
        r#"
            INSERT INTO catalog_items (merchant_id, item_id, name, unit_price, updated_at) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (merchant_id, item_id) DO UPDATE
                SET name = excluded.name, unit_price = excluded.unit_price, updated_at = excluded.updated_at
            RETURNING merchant_id, item_id, name, unit_price, updated_at;
        "#,
    )
    .bind(item.merchant_id)
    .bind(item.item_id)
    .bind(item.name)
    .bind(item.unit_price)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Catalog item {}/{} priced at {}", item.merchant_id, item.item_id, item.unit_price);
    Ok(item)
}

pub async fn fetch_catalog_item(
    merchant: &MerchantId,
    item: &ItemId,
    conn: &mut SqliteConnection,
) -> Result<Option<CatalogItem>, LedgerError> {
    let item = sqlx::query_as::<_, CatalogItem>(
        r#"
            SELECT merchant_id, item_id, name, unit_price, updated_at
            FROM catalog_items
            WHERE merchant_id = $1 AND item_id = $2
        "#,
    )
    .bind(merchant)
    .bind(item)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}
