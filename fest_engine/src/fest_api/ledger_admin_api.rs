use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        CatalogItem,
        InventoryRecord,
        ItemId,
        Merchant,
        MerchantId,
        NewCatalogItem,
        NewMerchant,
        SequenceCounter,
    },
    traits::{LedgerDatabase, LedgerError},
};

/// Administrative operations on merchants, catalogs, stock and token sequences.
pub struct LedgerAdminApi<B> {
    db: B,
}

impl<B: Debug> Debug for LedgerAdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerAdminApi ({:?})", self.db)
    }
}

impl<B> LedgerAdminApi<B>
where B: LedgerDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn upsert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, LedgerError> {
        if merchant.id.as_str().trim().is_empty() || merchant.name.trim().is_empty() {
            return Err(LedgerError::ValidationError("Merchant id and name are required".into()));
        }
        let merchant = self.db.upsert_merchant(merchant).await?;
        info!("🗃️ Merchant {} ({}) saved", merchant.id, merchant.name);
        Ok(merchant)
    }

    pub async fn upsert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, LedgerError> {
        if !item.unit_price.is_positive() {
            return Err(LedgerError::ValidationError(format!("{} must have a positive price", item.item_id)));
        }
        if self.db.fetch_merchant(&item.merchant_id).await?.is_none() {
            return Err(LedgerError::NotFound(format!("Merchant {}", item.merchant_id)));
        }
        let item = self.db.upsert_catalog_item(item).await?;
        info!("🗃️ Catalog item {} at {} now costs {}", item.item_id, item.merchant_id, item.unit_price);
        Ok(item)
    }

    pub async fn restock(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
        quantity: i64,
    ) -> Result<InventoryRecord, LedgerError> {
        if quantity < 1 {
            return Err(LedgerError::ValidationError(format!("Restock quantity must be at least 1, not {quantity}")));
        }
        if self.db.fetch_catalog_item(merchant, item).await?.is_none() {
            return Err(LedgerError::NotFound(format!("Item {item} at {merchant}")));
        }
        let record = self.db.increase_available(merchant, item, quantity).await?;
        info!("🗃️ {item} at {merchant} restocked by {quantity}. {} available", record.available_count);
        Ok(record)
    }

    pub async fn inventory(
        &self,
        merchant: &MerchantId,
        item: &ItemId,
    ) -> Result<Option<InventoryRecord>, LedgerError> {
        self.db.fetch_inventory(merchant, item).await
    }

    /// Starts a new token epoch for the merchant. Checkouts already in flight may still receive tokens from the old
    /// epoch; the epoch number on every order tells them apart.
    pub async fn reset_sequence(&self, merchant: &MerchantId) -> Result<SequenceCounter, LedgerError> {
        if self.db.fetch_merchant(merchant).await?.is_none() {
            return Err(LedgerError::NotFound(format!("Merchant {merchant}")));
        }
        let counter = self.db.reset_sequence(merchant).await?;
        warn!("🗃️ Token sequence for {merchant} reset. Epoch is now {}", counter.epoch);
        Ok(counter)
    }
}
